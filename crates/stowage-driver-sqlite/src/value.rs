use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{
    types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef},
    Row,
};
use stowage_core::{Error, Result, Value};
use stowage_sql::{ColumnType, Param};

const DATE_FORMAT: &str = "%F";
const TIMESTAMP_FORMAT: &str = "%F %T%.6f";
const TIMESTAMP_PARSE_FORMAT: &str = "%F %T%.f";

/// Binds a parameter. Times are stored as ISO-8601 text so they sort and
/// compare as strings.
pub(crate) struct Bind<'a>(pub(crate) &'a Param);

impl ToSql for Bind<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let output = match &self.0.value {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(v) => ToSqlOutput::Owned(SqlValue::Integer(*v as i64)),
            Value::I64(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::U64(v) => {
                let v = i64::try_from(*v)
                    .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
                ToSqlOutput::Owned(SqlValue::Integer(v))
            }
            Value::F64(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::String(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
            Value::Time(v) => {
                let format = match self.0.ty {
                    ColumnType::Date => DATE_FORMAT,
                    _ => TIMESTAMP_FORMAT,
                };
                ToSqlOutput::Owned(SqlValue::Text(v.format(format).to_string()))
            }
        };
        Ok(output)
    }
}

/// Reads column `index` of `row` as a value of `ty`.
pub(crate) fn load(row: &Row<'_>, index: usize, ty: ColumnType) -> Result<Value> {
    let value = row.get_ref(index).map_err(Error::driver_operation_failed)?;

    let value = match (value, ty) {
        (ValueRef::Null, _) => Value::Null,
        (ValueRef::Integer(v), ColumnType::Boolean) => Value::Bool(v != 0),
        (ValueRef::Integer(v), _) => Value::I64(v),
        (ValueRef::Real(v), _) => Value::F64(v),
        (ValueRef::Text(v), ColumnType::Date) => {
            let text = text(v)?;
            let date = NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map_err(Error::driver_operation_failed)?;
            Value::Time(date.and_time(NaiveTime::default()).and_utc())
        }
        (ValueRef::Text(v), ColumnType::Timestamp(_)) => {
            let text = text(v)?;
            let time = NaiveDateTime::parse_from_str(text, TIMESTAMP_PARSE_FORMAT)
                .map_err(Error::driver_operation_failed)?;
            Value::Time(time.and_utc())
        }
        (ValueRef::Text(v), _) => Value::String(text(v)?.to_string()),
        (ValueRef::Blob(v), _) => Value::Bytes(v.to_vec()),
    };
    Ok(value)
}

fn text(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(Error::driver_operation_failed)
}
