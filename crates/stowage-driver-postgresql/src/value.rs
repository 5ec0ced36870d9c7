use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use postgres::{
    types::{accepts, private::BytesMut, to_sql_checked, IsNull, ToSql, Type},
    Row,
};
use stowage_core::{Error, Result, Value};
use stowage_sql::{ColumnType, Param};

/// Binds a parameter, narrowing integers to the server's inferred type.
#[derive(Debug)]
pub(crate) struct Bind<'a>(pub(crate) &'a Param);

impl ToSql for Bind<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>>
    where
        Self: Sized,
    {
        match &self.0.value {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(value) => match *ty {
                Type::BOOL => value.to_sql(ty, out),
                _ => integer_to_sql(*value as i64, ty, out),
            },
            Value::I64(value) => integer_to_sql(*value, ty, out),
            Value::U64(value) => integer_to_sql(i64::try_from(*value)?, ty, out),
            Value::F64(value) => match *ty {
                Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            Value::String(value) => value.to_sql(ty, out),
            Value::Bytes(value) => value.to_sql(ty, out),
            Value::Time(value) => match *ty {
                Type::DATE => value.date_naive().to_sql(ty, out),
                Type::TIMESTAMP => value.naive_utc().to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
        }
    }

    accepts!(
        BOOL,
        INT2,
        INT4,
        INT8,
        FLOAT4,
        FLOAT8,
        TEXT,
        VARCHAR,
        BPCHAR,
        BYTEA,
        DATE,
        TIMESTAMP,
        TIMESTAMPTZ
    );

    to_sql_checked!();
}

fn integer_to_sql(
    value: i64,
    ty: &Type,
    out: &mut BytesMut,
) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
    match *ty {
        Type::BOOL => (value != 0).to_sql(ty, out),
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        _ => value.to_sql(ty, out),
    }
}

/// Reads column `index` of `row` as a value of `ty`.
pub(crate) fn load(row: &Row, index: usize, ty: ColumnType) -> Result<Value> {
    let value = match ty {
        ColumnType::Boolean => get::<bool>(row, index)?.map(Value::Bool),
        ColumnType::SmallInt => get::<i16>(row, index)?.map(|v| Value::I64(v.into())),
        ColumnType::Integer => get::<i32>(row, index)?.map(|v| Value::I64(v.into())),
        ColumnType::BigInt => get::<i64>(row, index)?.map(Value::I64),
        ColumnType::Double => get::<f64>(row, index)?.map(Value::F64),
        // CHAR columns come back blank padded.
        ColumnType::Char(_) => {
            get::<String>(row, index)?.map(|v| Value::String(v.trim_end_matches(' ').to_string()))
        }
        ColumnType::VarChar(_) | ColumnType::Text => get::<String>(row, index)?.map(Value::String),
        ColumnType::Blob => get::<Vec<u8>>(row, index)?.map(Value::Bytes),
        ColumnType::Date => get::<NaiveDate>(row, index)?
            .map(|v| Value::Time(v.and_time(NaiveTime::default()).and_utc())),
        ColumnType::Timestamp(_) => {
            get::<NaiveDateTime>(row, index)?.map(|v| Value::Time(v.and_utc()))
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

fn get<'a, T>(row: &'a Row, index: usize) -> Result<Option<T>>
where
    T: postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(index)
        .map_err(Error::driver_operation_failed)
}
