//! Object to BSON document mapping.
//!
//! Groups become arrays and nested objects become subdocuments. Null fields,
//! null nested objects and null groups are left out of saved documents; a
//! missing key reads back as null.

use crate::value::{self, from_bson, to_bson};

use bson::{Bson, Document};
use chrono::{TimeZone, Utc};
use stowage_core::object::visit::{self, Visit};
use stowage_core::{Element, Error, Field, Member, Object, ObjectIdentity, Result};

/// Name of the store-assigned document id.
pub const ID_FIELD: &str = "_id";

/// Encodes the whole object.
pub fn to_document(object: &Object) -> Result<Document> {
    let mut doc = Document::new();

    for member in object.members() {
        match member {
            Member::Field(field) => {
                if !field.is_null() {
                    doc.insert(field.name(), to_bson(field.value(), field.meta())?);
                }
            }
            Member::Object(nested) => {
                if !nested.is_null() {
                    doc.insert(nested.name(), to_document(nested)?);
                }
            }
            Member::Group(group) => {
                if !group.is_null() {
                    let items = group
                        .iter()
                        .map(element_to_bson)
                        .collect::<Result<Vec<_>>>()?;
                    doc.insert(group.name(), items);
                }
            }
        }
    }

    Ok(doc)
}

fn element_to_bson(element: &Element) -> Result<Bson> {
    match element {
        Element::Object(object) if object.is_null() => Ok(Bson::Null),
        Element::Object(object) => Ok(Bson::Document(to_document(object)?)),
        Element::Field(field) => to_bson(field.value(), field.meta()),
    }
}

/// Names of the outermost members that are absent from [`to_document`]'s
/// output, for `$unset` on partial updates.
pub fn null_members(object: &Object) -> Vec<String> {
    object
        .members()
        .iter()
        .filter(|member| match member {
            Member::Field(field) => field.is_null(),
            Member::Object(nested) => nested.is_null(),
            Member::Group(group) => group.is_null(),
        })
        .map(|member| member.name().to_string())
        .collect()
}

/// Populates `object` from a stored document.
///
/// Unknown keys are ignored. The `_id` value is returned separately and is
/// never merged into the object.
pub fn read(object: &mut Object, doc: &Document) -> Result<Option<ObjectIdentity>> {
    read_object(object, doc)?;

    let identity = match doc.get(ID_FIELD) {
        Some(Bson::ObjectId(oid)) => Some(ObjectIdentity {
            id: oid.to_hex(),
            created: Utc
                .timestamp_millis_opt(oid.timestamp().timestamp_millis())
                .single()
                .unwrap_or_default(),
        }),
        _ => None,
    };
    Ok(identity)
}

fn read_object(object: &mut Object, doc: &Document) -> Result<()> {
    for member in object.members_mut() {
        match member {
            Member::Field(field) => {
                if let Some(bson) = doc.get(field.name()) {
                    field.load(from_bson(bson, field.meta())?)?;
                }
            }
            Member::Object(nested) => match doc.get(nested.name()) {
                None | Some(Bson::Null) if nested.is_nullable() => nested.set_null(true),
                None => {}
                Some(Bson::Document(sub)) => read_object(nested, sub)?,
                Some(other) => {
                    return Err(Error::native_conversion(
                        value::type_name(other),
                        format!("object `{}`", nested.name()),
                    ))
                }
            },
            Member::Group(group) => match doc.get(group.name()) {
                None | Some(Bson::Null) if group.is_nullable() => group.set_null(true),
                None => {}
                Some(Bson::Array(items)) => {
                    group.set_null(false);
                    for item in items {
                        read_element(group.push(), item)?;
                    }
                }
                Some(other) => {
                    return Err(Error::native_conversion(
                        value::type_name(other),
                        format!("group `{}`", group.name()),
                    ))
                }
            },
        }
    }
    Ok(())
}

fn read_element(element: &mut Element, bson: &Bson) -> Result<()> {
    match (element, bson) {
        (Element::Object(object), Bson::Null) if object.is_nullable() => object.set_null(true),
        (Element::Object(object), Bson::Document(doc)) => read_object(object, doc)?,
        (Element::Object(object), other) => {
            return Err(Error::native_conversion(
                value::type_name(other),
                format!("object `{}`", object.name()),
            ))
        }
        (Element::Field(field), bson) => field.load(from_bson(bson, field.meta())?)?,
    }
    Ok(())
}

/// Equality on every key field.
pub fn key_filter(object: &Object) -> Result<Document> {
    let mut doc = Document::new();
    for field in object.key_fields() {
        doc.insert(field.name(), to_bson(&field.stored_value(), field.meta())?);
    }
    Ok(doc)
}

/// Equality on the modified fields of the outermost object, nested ones by
/// dotted path, plus every non-null key field.
pub fn example_filter(object: &Object) -> Result<Document> {
    let example = object.visit(Example::default());
    match example.error {
        Some(err) => Err(err),
        None => Ok(example.doc),
    }
}

/// Index keys document over the key fields.
pub fn index_keys(object: &Object) -> Document {
    let mut doc = Document::new();
    for field in object.key_fields() {
        doc.insert(field.name(), 1);
    }
    doc
}

#[derive(Default)]
struct Example {
    path: Vec<String>,
    doc: Document,
    error: Option<Error>,
}

impl Visit for Example {
    fn visit_member(&mut self, node: &Member) {
        match node {
            Member::Field(field) => self.visit_field(field),
            Member::Object(nested) => {
                self.path.push(nested.name().to_string());
                visit::visit_object(self, nested);
                self.path.pop();
            }
            Member::Group(_) => {}
        }
    }

    fn visit_field(&mut self, node: &Field) {
        if self.error.is_some() || !(node.is_modified() || (node.is_key() && !node.is_null())) {
            return;
        }

        match to_bson(node.value(), node.meta()) {
            Ok(bson) => {
                let mut path = self.path.clone();
                path.push(node.name().to_string());
                self.doc.insert(path.join("."), bson);
            }
            Err(err) => self.error = Some(err),
        }
    }
}
