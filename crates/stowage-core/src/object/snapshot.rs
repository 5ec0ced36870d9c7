use super::{Element, Field, Member, Object};
use crate::Value;

use serde_json::{json, Map};

pub(super) fn object_to_json(object: &Object) -> serde_json::Value {
    if object.is_null() {
        return serde_json::Value::Null;
    }

    let mut map = Map::new();
    for member in object.members() {
        let value = match member {
            Member::Field(field) => field_to_json(field),
            Member::Object(object) => object_to_json(object),
            Member::Group(group) if group.is_null() => serde_json::Value::Null,
            Member::Group(group) => group
                .iter()
                .map(|element| match element {
                    Element::Object(object) => object_to_json(object),
                    Element::Field(field) => field_to_json(field),
                })
                .collect(),
        };
        map.insert(member.name().to_string(), value);
    }
    serde_json::Value::Object(map)
}

fn field_to_json(field: &Field) -> serde_json::Value {
    match field.value() {
        Value::Null => serde_json::Value::Null,
        Value::Bool(v) => json!(v),
        Value::I64(v) => json!(v),
        Value::U64(v) => json!(v),
        Value::F64(v) => json!(v),
        Value::String(v) => json!(v),
        Value::Bytes(v) => json!(v
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<String>()),
        Value::Time(v) => json!(v.to_rfc3339()),
    }
}
