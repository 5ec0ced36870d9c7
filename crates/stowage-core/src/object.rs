mod builder;
pub use builder::{ObjectBuilder, Template};

mod field;
pub use field::Field;

mod group;
pub use group::{Element, RepeatedGroup};

mod identity;
pub use identity::ObjectIdentity;

mod snapshot;

pub mod visit;
pub use visit::Visit;

use crate::{Error, Result, ScalarKind, Value};

/// A member of an [`Object`].
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(Field),
    Object(Object),
    Group(RepeatedGroup),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Field(field) => field.name(),
            Member::Object(object) => object.name(),
            Member::Group(group) => group.name(),
        }
    }

    pub fn is_modified(&self) -> bool {
        match self {
            Member::Field(field) => field.is_modified(),
            Member::Object(object) => object.is_modified(),
            Member::Group(group) => group.is_modified(),
        }
    }

    fn clear(&mut self) {
        match self {
            Member::Field(field) => field.clear(),
            Member::Object(object) => object.clear(),
            Member::Group(group) => group.reset(),
        }
    }

    fn clear_modified(&mut self) {
        match self {
            Member::Field(field) => field.set_modified(false),
            Member::Object(object) => object.clear_modified(),
            Member::Group(group) => group.clear_modified(),
        }
    }
}

/// How a save must treat the object's version field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// The object has no version field.
    None,
    /// The version is the `-1` sentinel: the stored state is not known.
    Unknown,
    /// Version `0`: the object has never been stored.
    New,
    /// A stored version to check against.
    Existing(i64),
}

impl Version {
    /// True when a failed insert may fall back to an update.
    pub fn allows_update_fallback(self) -> bool {
        matches!(self, Version::None | Version::Unknown)
    }
}

/// A tree of fields, nested objects and repeated groups.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    type_name: String,
    name: String,
    backend_name: Option<String>,
    members: Vec<Member>,
    nullable: bool,
    null: bool,
    modified: bool,
}

impl Object {
    pub fn builder(type_name: impl Into<String>) -> ObjectBuilder {
        ObjectBuilder::new(type_name)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Member name of a nested object; the type name for the outermost one.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table or collection name: the override if one was set, else the type name.
    pub fn backend_name(&self) -> &str {
        self.backend_name.as_deref().unwrap_or(&self.type_name)
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut [Member] {
        &mut self.members
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.name() == name)
    }

    pub fn member_mut(&mut self, name: &str) -> Option<&mut Member> {
        self.members.iter_mut().find(|member| member.name() == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        match self.member(name)? {
            Member::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        match self.member_mut(name)? {
            Member::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn object(&self, name: &str) -> Option<&Object> {
        match self.member(name)? {
            Member::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn object_mut(&mut self, name: &str) -> Option<&mut Object> {
        match self.member_mut(name)? {
            Member::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn group(&self, name: &str) -> Option<&RepeatedGroup> {
        match self.member(name)? {
            Member::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut RepeatedGroup> {
        match self.member_mut(name)? {
            Member::Group(group) => Some(group),
            _ => None,
        }
    }

    /// Value of the field `name`, if the object has such a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.field(name).map(Field::value)
    }

    /// Assigns the field `name` and marks it modified.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let type_name = self.type_name.clone();
        let field = self
            .field_mut(name)
            .ok_or_else(|| Error::invalid_object(format!("{type_name} has no field `{name}`")))?;
        field.set(value)?;
        self.null = false;
        Ok(())
    }

    /// Typed access to a nested object that must exist.
    pub fn expect_object_mut(&mut self, name: &str) -> Result<&mut Object> {
        let type_name = self.type_name.clone();
        self.object_mut(name)
            .ok_or_else(|| Error::invalid_object(format!("{type_name} has no object `{name}`")))
    }

    /// Typed access to a repeated group that must exist.
    pub fn expect_group_mut(&mut self, name: &str) -> Result<&mut RepeatedGroup> {
        let type_name = self.type_name.clone();
        self.group_mut(name)
            .ok_or_else(|| Error::invalid_object(format!("{type_name} has no group `{name}`")))
    }

    /// Key fields in key-ordinal order.
    pub fn key_fields(&self) -> Vec<&Field> {
        let mut keys = vec![];
        visit::for_each_key_field(self, |field| keys.push(field));
        keys
    }

    /// Renders the key as `Type(a=1, b="x")` for diagnostics.
    pub fn describe_key(&self) -> String {
        let keys = self
            .key_fields()
            .iter()
            .map(|field| format!("{}={}", field.name(), field.value()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({keys})", self.type_name)
    }

    pub fn version_field(&self) -> Option<&Field> {
        self.members.iter().find_map(|member| match member {
            Member::Field(field) if field.is_version() => Some(field),
            _ => None,
        })
    }

    fn version_field_mut(&mut self) -> Option<&mut Field> {
        self.members.iter_mut().find_map(|member| match member {
            Member::Field(field) if field.is_version() => Some(field),
            _ => None,
        })
    }

    /// Classifies the version field for a save.
    pub fn version(&self) -> Result<Version> {
        let Some(field) = self.version_field() else {
            return Ok(Version::None);
        };

        match field.value().as_i64() {
            Some(-1) => Ok(Version::Unknown),
            Some(0) => Ok(Version::New),
            Some(v) if v > 0 => Ok(Version::Existing(v)),
            Some(_) => Err(Error::type_conversion(
                field.value().clone(),
                "version (-1 or greater)",
            )),
            None if field.is_null() => Err(Error::invalid_object(format!(
                "{} version field `{}` is null",
                self.type_name,
                field.name()
            ))),
            None => Err(Error::type_conversion(field.value().clone(), "version")),
        }
    }

    /// The version a successful save stores, or `None` without a version field.
    ///
    /// Fails when the current version is null or already at the field's maximum.
    pub fn next_version(&self) -> Result<Option<i64>> {
        let Some(field) = self.version_field() else {
            return Ok(None);
        };

        let next = match self.version()? {
            Version::Existing(v) => v.checked_add(1),
            _ => Some(1),
        };

        let max = match field.meta().kind() {
            ScalarKind::Signed { max, .. } => *max,
            ScalarKind::Unsigned { max } => i64::try_from(*max).unwrap_or(i64::MAX),
            _ => 0,
        };

        match next {
            Some(next) if next <= max => Ok(Some(next)),
            _ => Err(Error::type_conversion(
                field.value().clone(),
                format!("{} version overflow", self.type_name),
            )),
        }
    }

    /// Stores `version` into the version field without marking it modified.
    pub fn set_version(&mut self, version: i64) -> Result<()> {
        if let Some(field) = self.version_field_mut() {
            field.load(Value::I64(version))?;
        }
        Ok(())
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_null(&self) -> bool {
        self.null
    }

    /// Marks the object null, dropping member values, or revives it.
    pub fn set_null(&mut self, null: bool) {
        if null {
            for member in &mut self.members {
                member.clear();
            }
        }
        self.null = null;
        self.modified = true;
    }

    /// True if the object itself or any descendant was modified.
    pub fn is_modified(&self) -> bool {
        self.modified || self.members.iter().any(Member::is_modified)
    }

    /// Sets the object's own modified flag; descendants are untouched.
    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// Clears modified flags on the object and every descendant.
    pub fn clear_modified(&mut self) {
        self.modified = false;
        for member in &mut self.members {
            member.clear_modified();
        }
    }

    /// Resets to empty-but-typed: fields unset, groups empty, flags cleared.
    pub fn clear(&mut self) {
        for member in &mut self.members {
            member.clear();
        }
        self.null = false;
        self.modified = false;
    }

    /// Walks the object depth first.
    pub fn visit<V: Visit>(&self, mut visitor: V) -> V {
        visitor.visit_object(self);
        visitor
    }

    /// Field-by-field JSON rendering, used for audit records.
    pub fn to_json(&self) -> serde_json::Value {
        snapshot::object_to_json(self)
    }
}
