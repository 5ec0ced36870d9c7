use crate::Flavor;

use stowage_core::{Granularity, ScalarKind, ScalarMeta};

/// Column type chosen for a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Double,
    Char(usize),
    VarChar(usize),
    Text,
    Blob,
    Date,
    /// Date and time with the given number of fractional second digits.
    Timestamp(u32),
}

impl ColumnType {
    pub fn from_meta(meta: &ScalarMeta) -> ColumnType {
        if meta.is_boolean() {
            return ColumnType::Boolean;
        }

        match *meta.kind() {
            ScalarKind::Boolean => ColumnType::Boolean,
            ScalarKind::Signed { min, max } => {
                if min >= i16::MIN.into() && max <= i16::MAX.into() {
                    ColumnType::SmallInt
                } else if min >= i32::MIN.into() && max <= i32::MAX.into() {
                    ColumnType::Integer
                } else {
                    ColumnType::BigInt
                }
            }
            ScalarKind::Unsigned { max } => {
                if max <= i16::MAX as u64 {
                    ColumnType::SmallInt
                } else if max <= i32::MAX as u64 {
                    ColumnType::Integer
                } else {
                    ColumnType::BigInt
                }
            }
            ScalarKind::Float => ColumnType::Double,
            ScalarKind::Text { max_len: Some(n) } if n <= 4 => ColumnType::Char(n),
            ScalarKind::Text { max_len: Some(n) } if n <= 255 => ColumnType::VarChar(n),
            ScalarKind::Text { .. } => ColumnType::Text,
            ScalarKind::Time(Granularity::Day) => ColumnType::Date,
            ScalarKind::Time(g) => ColumnType::Timestamp(g.fraction_digits()),
            ScalarKind::Blob => ColumnType::Blob,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt
        )
    }

    pub fn sql_name(&self, flavor: Flavor) -> String {
        match (self, flavor) {
            (ColumnType::Boolean, _) => "BOOLEAN".to_string(),
            (ColumnType::SmallInt, _) => "SMALLINT".to_string(),
            (ColumnType::Integer, _) => "INTEGER".to_string(),
            (ColumnType::BigInt, _) => "BIGINT".to_string(),
            (ColumnType::Double, Flavor::Postgresql) => "DOUBLE PRECISION".to_string(),
            (ColumnType::Double, Flavor::Sqlite) => "REAL".to_string(),
            (ColumnType::Char(n), _) => format!("CHAR({n})"),
            (ColumnType::VarChar(n), _) => format!("VARCHAR({n})"),
            (ColumnType::Text, _) => "TEXT".to_string(),
            (ColumnType::Blob, Flavor::Postgresql) => "BYTEA".to_string(),
            (ColumnType::Blob, Flavor::Sqlite) => "BLOB".to_string(),
            (ColumnType::Date, _) => "DATE".to_string(),
            (ColumnType::Timestamp(p), Flavor::Postgresql) => format!("TIMESTAMP({p})"),
            (ColumnType::Timestamp(_), Flavor::Sqlite) => "TIMESTAMP".to_string(),
        }
    }
}
