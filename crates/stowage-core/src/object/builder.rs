use super::{Element, Field, Member, Object, RepeatedGroup};
use crate::{Error, Result, ScalarMeta};

use std::collections::HashSet;

/// Element template of a repeated group.
#[derive(Debug)]
pub enum Template {
    Object(ObjectBuilder),
    Scalar(ScalarMeta),
}

impl Template {
    pub fn object(builder: ObjectBuilder) -> Template {
        Template::Object(builder)
    }

    pub fn scalar(meta: ScalarMeta) -> Template {
        Template::Scalar(meta)
    }
}

#[derive(Debug)]
enum Pending {
    Field(Field),
    Object(String, ObjectBuilder),
    Group {
        name: String,
        template: Template,
        nullable: bool,
    },
}

/// Declares the shape of an [`Object`].
///
/// ```
/// use stowage_core::{Object, ObjectBuilder, ScalarMeta, Template};
///
/// let order = Object::builder("Order")
///     .key("id", ScalarMeta::i64())
///     .version("version")
///     .field("customer", ScalarMeta::text_max(40))
///     .group(
///         "items",
///         Template::object(ObjectBuilder::new("Item").field("sku", ScalarMeta::text())),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(order.key_fields().len(), 1);
/// ```
#[derive(Debug)]
pub struct ObjectBuilder {
    type_name: String,
    backend_name: Option<String>,
    members: Vec<Pending>,
    nullable: bool,
    next_key: u32,
}

impl ObjectBuilder {
    pub fn new(type_name: impl Into<String>) -> ObjectBuilder {
        ObjectBuilder {
            type_name: type_name.into(),
            backend_name: None,
            members: vec![],
            nullable: false,
            next_key: 1,
        }
    }

    /// Overrides the table or collection name.
    pub fn backend_name(mut self, name: impl Into<String>) -> Self {
        self.backend_name = Some(name.into());
        self
    }

    /// Allows the object to be null when nested in another object.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Adds a key field. Key ordinals follow declaration order.
    pub fn key(mut self, name: impl Into<String>, meta: ScalarMeta) -> Self {
        let ordinal = self.next_key;
        self.next_key += 1;
        self.members
            .push(Pending::Field(Field::new_key(name, meta, ordinal)));
        self
    }

    pub fn field(mut self, name: impl Into<String>, meta: ScalarMeta) -> Self {
        self.members.push(Pending::Field(Field::new(name, meta)));
        self
    }

    /// Adds the optimistic version field. New objects start at version 0.
    pub fn version(mut self, name: impl Into<String>) -> Self {
        self.members.push(Pending::Field(Field::new_version(name)));
        self
    }

    pub fn object(mut self, name: impl Into<String>, builder: ObjectBuilder) -> Self {
        self.members.push(Pending::Object(name.into(), builder));
        self
    }

    pub fn group(mut self, name: impl Into<String>, template: Template) -> Self {
        self.members.push(Pending::Group {
            name: name.into(),
            template,
            nullable: false,
        });
        self
    }

    /// Adds a repeated group that may be null as a whole.
    pub fn nullable_group(mut self, name: impl Into<String>, template: Template) -> Self {
        self.members.push(Pending::Group {
            name: name.into(),
            template,
            nullable: true,
        });
        self
    }

    /// Builds an outermost object. It must declare at least one key field.
    pub fn build(self) -> Result<Object> {
        let type_name = self.type_name.clone();
        let object = self.finish(type_name, true)?;
        if object.key_fields().is_empty() {
            return Err(Error::invalid_object(format!(
                "{} declares no key fields",
                object.type_name()
            )));
        }
        Ok(object)
    }

    /// Builds an object used as a group element or nested member.
    pub fn build_element(self) -> Result<Object> {
        let type_name = self.type_name.clone();
        self.finish(type_name, false)
    }

    fn finish(self, name: String, outermost: bool) -> Result<Object> {
        let invalid = |message: String| Error::invalid_object(format!("{}: {message}", self.type_name));

        let mut names = HashSet::new();
        let mut versions = 0;
        let mut members = Vec::with_capacity(self.members.len());

        for pending in self.members {
            let member = match pending {
                Pending::Field(field) => {
                    if field.is_key() && field.meta().is_nullable() {
                        return Err(invalid(format!("key field `{}` is nullable", field.name())));
                    }
                    if (field.is_key() || field.is_version()) && !outermost {
                        return Err(invalid(format!(
                            "`{}` must be declared on the outermost object",
                            field.name()
                        )));
                    }
                    if field.is_version() {
                        versions += 1;
                    }
                    Member::Field(field)
                }
                Pending::Object(name, builder) => Member::Object(builder.finish(name, false)?),
                Pending::Group {
                    name,
                    template,
                    nullable,
                } => {
                    let template = match template {
                        Template::Object(builder) => {
                            Element::Object(builder.finish(name.clone(), false)?)
                        }
                        Template::Scalar(meta) => Element::Field(Field::new(name.clone(), meta)),
                    };
                    Member::Group(RepeatedGroup::new(name, template, nullable))
                }
            };

            if !names.insert(member.name().to_string()) {
                return Err(invalid(format!("duplicate member `{}`", member.name())));
            }
            members.push(member);
        }

        if versions > 1 {
            return Err(invalid("more than one version field".to_string()));
        }

        Ok(Object {
            type_name: self.type_name,
            name,
            backend_name: self.backend_name,
            members,
            nullable: self.nullable,
            null: false,
            modified: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_key() {
        let err = ObjectBuilder::new("Note")
            .field("text", ScalarMeta::text())
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid object: Note declares no key fields");
    }

    #[test]
    fn rejects_duplicates() {
        let err = ObjectBuilder::new("Note")
            .key("id", ScalarMeta::i32())
            .field("id", ScalarMeta::text())
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid object: Note: duplicate member `id`");
    }

    #[test]
    fn rejects_nested_keys() {
        let err = ObjectBuilder::new("Order")
            .key("id", ScalarMeta::i32())
            .object(
                "address",
                ObjectBuilder::new("Address").key("street", ScalarMeta::text()),
            )
            .build()
            .unwrap_err();
        assert!(err.is_invalid_object());
    }

    #[test]
    fn key_ordinals_follow_declaration() {
        let obj = ObjectBuilder::new("Line")
            .key("order", ScalarMeta::i64())
            .field("note", ScalarMeta::text())
            .key("line", ScalarMeta::i32())
            .build()
            .unwrap();
        let keys = obj
            .key_fields()
            .iter()
            .map(|f| (f.name().to_string(), f.key()))
            .collect::<Vec<_>>();
        assert_eq!(keys, vec![("order".into(), 1), ("line".into(), 2)]);
    }
}
