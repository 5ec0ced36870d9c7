use bson::{spec::BinarySubtype, Binary, Bson, DateTime, Decimal128};
use chrono::{TimeZone, Utc};
use stowage_core::{Error, Result, ScalarKind, ScalarMeta, Value};

/// High 64 bits of a Decimal128 holding an integer coefficient below 2^64
/// with exponent 0.
const DECIMAL_INTEGER_HIGH: u64 = 0x3040_0000_0000_0000;

/// Encodes a scalar by its metadata. Nulls encode as `Bson::Null`; callers
/// omit them from documents.
pub fn to_bson(value: &Value, meta: &ScalarMeta) -> Result<Bson> {
    if value.is_null() {
        return Ok(Bson::Null);
    }

    let bson = match meta.kind() {
        ScalarKind::Time(_) => {
            let time = value
                .as_time()
                .ok_or_else(|| Error::type_conversion(value.clone(), meta.type_name()))?;
            Bson::DateTime(DateTime::from_millis(time.timestamp_millis()))
        }
        ScalarKind::Text { .. } => Bson::String(
            value
                .as_str()
                .ok_or_else(|| Error::type_conversion(value.clone(), meta.type_name()))?
                .to_string(),
        ),
        ScalarKind::Signed { .. } => {
            let v = value
                .as_i64()
                .ok_or_else(|| Error::type_conversion(value.clone(), meta.type_name()))?;
            match i32::try_from(v) {
                Ok(v) => Bson::Int32(v),
                Err(_) => Bson::Int64(v),
            }
        }
        ScalarKind::Boolean | ScalarKind::Unsigned { max: 1 } => Bson::Boolean(
            value
                .as_bool()
                .ok_or_else(|| Error::type_conversion(value.clone(), meta.type_name()))?,
        ),
        ScalarKind::Unsigned { .. } => {
            let v = value
                .as_u64()
                .ok_or_else(|| Error::type_conversion(value.clone(), meta.type_name()))?;
            if let Ok(v) = i32::try_from(v) {
                Bson::Int32(v)
            } else if let Ok(v) = i64::try_from(v) {
                Bson::Int64(v)
            } else {
                Bson::Decimal128(decimal_from_u64(v))
            }
        }
        ScalarKind::Blob => Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: value
                .as_bytes()
                .ok_or_else(|| Error::type_conversion(value.clone(), meta.type_name()))?
                .to_vec(),
        }),
        ScalarKind::Float => Bson::Double(
            value
                .as_f64()
                .ok_or_else(|| Error::type_conversion(value.clone(), meta.type_name()))?,
        ),
    };
    Ok(bson)
}

/// Decodes a document value into a scalar of the given kind.
///
/// Each BSON type is accepted only by the matching kind; there is no
/// cross-type coercion.
pub fn from_bson(bson: &Bson, meta: &ScalarMeta) -> Result<Value> {
    let mismatch = || Error::native_conversion(type_name(bson), meta.type_name());

    let value = match (bson, meta.kind()) {
        (Bson::Null, _) if meta.is_nullable() => Value::Null,
        (Bson::Boolean(v), _) if meta.is_boolean() => Value::Bool(*v),
        (Bson::Int32(v), _) if meta.is_integer() => Value::I64((*v).into()),
        (Bson::Int64(v), _) if meta.is_integer() => Value::I64(*v),
        (Bson::Decimal128(v), ScalarKind::Unsigned { .. }) => {
            Value::U64(u64_from_decimal(v).ok_or_else(mismatch)?)
        }
        (Bson::DateTime(v), ScalarKind::Time(_)) => Value::Time(
            Utc.timestamp_millis_opt(v.timestamp_millis())
                .single()
                .ok_or_else(mismatch)?,
        ),
        (Bson::String(v), ScalarKind::Text { .. }) => Value::String(v.clone()),
        (Bson::Binary(v), ScalarKind::Blob) => Value::Bytes(v.bytes.clone()),
        (Bson::Double(v), ScalarKind::Float) => Value::F64(*v),
        _ => return Err(mismatch()),
    };

    // Range and length checks.
    meta.coerce(value)
}

fn decimal_from_u64(v: u64) -> Decimal128 {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&v.to_le_bytes());
    bytes[8..].copy_from_slice(&DECIMAL_INTEGER_HIGH.to_le_bytes());
    Decimal128::from_bytes(bytes)
}

fn u64_from_decimal(v: &Decimal128) -> Option<u64> {
    let bytes = v.bytes();
    let (low, high) = bytes.split_at(8);
    let high = u64::from_le_bytes(high.try_into().ok()?);
    if high != DECIMAL_INTEGER_HIGH {
        return None;
    }
    Some(u64::from_le_bytes(low.try_into().ok()?))
}

pub(crate) fn type_name(bson: &Bson) -> &'static str {
    match bson {
        Bson::Double(_) => "Double",
        Bson::String(_) => "String",
        Bson::Array(_) => "Array",
        Bson::Document(_) => "Document",
        Bson::Boolean(_) => "Boolean",
        Bson::Null => "Null",
        Bson::Int32(_) => "Int32",
        Bson::Int64(_) => "Int64",
        Bson::Timestamp(_) => "Timestamp",
        Bson::Binary(_) => "Binary",
        Bson::ObjectId(_) => "ObjectId",
        Bson::DateTime(_) => "DateTime",
        Bson::Decimal128(_) => "Decimal128",
        _ => "unsupported BSON type",
    }
}
