use crate::{Result, ScalarMeta, Value};

/// A named scalar slot inside an [`Object`](crate::Object).
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    value: Value,
    meta: ScalarMeta,
    modified: bool,
    /// Position within the object's key; 0 when the field is not part of it.
    key: u32,
    version: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, meta: ScalarMeta) -> Field {
        Field {
            name: name.into(),
            value: Value::Null,
            meta,
            modified: false,
            key: 0,
            version: false,
        }
    }

    pub(crate) fn new_key(name: impl Into<String>, meta: ScalarMeta, ordinal: u32) -> Field {
        Field {
            key: ordinal,
            ..Field::new(name, meta)
        }
    }

    pub(crate) fn new_version(name: impl Into<String>) -> Field {
        Field {
            value: Value::I64(0),
            version: true,
            ..Field::new(name, ScalarMeta::i64())
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn meta(&self) -> &ScalarMeta {
        &self.meta
    }

    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn is_key(&self) -> bool {
        self.key > 0
    }

    pub fn is_version(&self) -> bool {
        self.version
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// Assigns a value and marks the field modified.
    pub fn set(&mut self, value: impl Into<Value>) -> Result<()> {
        self.value = self.meta.coerce(value.into())?;
        self.modified = true;
        Ok(())
    }

    pub fn set_null(&mut self) {
        self.value = Value::Null;
        self.modified = true;
    }

    /// Assigns a value read from a backend; the modified flag is left alone.
    pub fn load(&mut self, value: Value) -> Result<()> {
        self.value = self.meta.coerce(value)?;
        Ok(())
    }

    /// The value to store: unset non-nullable fields are written as their
    /// kind's empty value.
    pub fn stored_value(&self) -> Value {
        match self.value {
            Value::Null if !self.meta.is_nullable() => self.meta.empty_value(),
            _ => self.value.clone(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.value = if self.version {
            Value::I64(0)
        } else {
            Value::Null
        };
        self.modified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_value_of_unset_field() {
        let field = Field::new("qty", ScalarMeta::u32());
        assert_eq!(field.stored_value(), Value::U64(0));

        let field = Field::new("note", ScalarMeta::text().nullable());
        assert_eq!(field.stored_value(), Value::Null);
    }

    #[test]
    fn load_does_not_mark_modified() {
        let mut field = Field::new("qty", ScalarMeta::u32());
        field.load(Value::I64(3)).unwrap();
        assert_eq!(field.value(), &Value::U64(3));
        assert!(!field.is_modified());
    }
}
