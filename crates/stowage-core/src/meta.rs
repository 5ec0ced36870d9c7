use crate::{Error, Result, Value};

use chrono::{DateTime, Utc};

/// Resolution at which a time field is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Granularity {
    Microsecond,
    Millisecond,
    Centisecond,
    Decisecond,
    Second,
    Day,
}

impl Granularity {
    /// Length of one unit in microseconds.
    pub fn micros(self) -> i64 {
        match self {
            Granularity::Microsecond => 1,
            Granularity::Millisecond => 1_000,
            Granularity::Centisecond => 10_000,
            Granularity::Decisecond => 100_000,
            Granularity::Second => 1_000_000,
            Granularity::Day => 86_400_000_000,
        }
    }

    /// Number of fractional second digits kept at this granularity.
    pub fn fraction_digits(self) -> u32 {
        match self {
            Granularity::Microsecond => 6,
            Granularity::Millisecond => 3,
            Granularity::Centisecond => 2,
            Granularity::Decisecond => 1,
            Granularity::Second | Granularity::Day => 0,
        }
    }

    /// Rounds `time` down to a whole unit.
    pub fn truncate(self, time: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let micros = time.timestamp_micros();
        let truncated = micros - micros.rem_euclid(self.micros());
        DateTime::from_timestamp_micros(truncated)
            .ok_or_else(|| Error::type_conversion(Value::Time(time), format!("{self:?} time")))
    }
}

/// What kind of scalar a field holds, with its declared bounds.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarKind {
    Boolean,
    Signed { min: i64, max: i64 },
    Unsigned { max: u64 },
    Float,
    Text { max_len: Option<usize> },
    Time(Granularity),
    Blob,
}

/// Per-field descriptor consumed by both mapping engines.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarMeta {
    kind: ScalarKind,
    nullable: bool,
}

impl ScalarMeta {
    pub fn new(kind: ScalarKind) -> ScalarMeta {
        ScalarMeta {
            kind,
            nullable: false,
        }
    }

    pub fn boolean() -> ScalarMeta {
        ScalarMeta::new(ScalarKind::Boolean)
    }

    pub fn signed(min: i64, max: i64) -> ScalarMeta {
        ScalarMeta::new(ScalarKind::Signed { min, max })
    }

    pub fn i16() -> ScalarMeta {
        ScalarMeta::signed(i16::MIN.into(), i16::MAX.into())
    }

    pub fn i32() -> ScalarMeta {
        ScalarMeta::signed(i32::MIN.into(), i32::MAX.into())
    }

    pub fn i64() -> ScalarMeta {
        ScalarMeta::signed(i64::MIN, i64::MAX)
    }

    pub fn unsigned(max: u64) -> ScalarMeta {
        ScalarMeta::new(ScalarKind::Unsigned { max })
    }

    pub fn u8() -> ScalarMeta {
        ScalarMeta::unsigned(u8::MAX.into())
    }

    pub fn u16() -> ScalarMeta {
        ScalarMeta::unsigned(u16::MAX.into())
    }

    pub fn u32() -> ScalarMeta {
        ScalarMeta::unsigned(u32::MAX.into())
    }

    pub fn u64() -> ScalarMeta {
        ScalarMeta::unsigned(u64::MAX)
    }

    pub fn float() -> ScalarMeta {
        ScalarMeta::new(ScalarKind::Float)
    }

    /// Text without a declared maximum length.
    pub fn text() -> ScalarMeta {
        ScalarMeta::new(ScalarKind::Text { max_len: None })
    }

    /// Text of at most `max_len` characters.
    pub fn text_max(max_len: usize) -> ScalarMeta {
        ScalarMeta::new(ScalarKind::Text {
            max_len: Some(max_len),
        })
    }

    /// A single character.
    pub fn character() -> ScalarMeta {
        ScalarMeta::text_max(1)
    }

    pub fn time(granularity: Granularity) -> ScalarMeta {
        ScalarMeta::new(ScalarKind::Time(granularity))
    }

    pub fn date() -> ScalarMeta {
        ScalarMeta::time(Granularity::Day)
    }

    pub fn blob() -> ScalarMeta {
        ScalarMeta::new(ScalarKind::Blob)
    }

    /// Allows the field to hold null.
    pub fn nullable(mut self) -> ScalarMeta {
        self.nullable = true;
        self
    }

    pub fn kind(&self) -> &ScalarKind {
        &self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// True for booleans and for unsigned fields bounded to 0/1.
    pub fn is_boolean(&self) -> bool {
        matches!(
            self.kind,
            ScalarKind::Boolean | ScalarKind::Unsigned { max: 1 }
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.kind,
            ScalarKind::Signed { .. } | ScalarKind::Unsigned { .. }
        )
    }

    /// The value a non-nullable field is written as while unset.
    pub fn empty_value(&self) -> Value {
        match self.kind {
            ScalarKind::Boolean => Value::Bool(false),
            ScalarKind::Signed { .. } => Value::I64(0),
            ScalarKind::Unsigned { .. } => Value::U64(0),
            ScalarKind::Float => Value::F64(0.0),
            ScalarKind::Text { .. } => Value::String(String::new()),
            ScalarKind::Time(_) => Value::Time(DateTime::UNIX_EPOCH),
            ScalarKind::Blob => Value::Bytes(Vec::new()),
        }
    }

    /// Short description used in conversion errors.
    pub fn type_name(&self) -> String {
        match self.kind {
            ScalarKind::Boolean => "Boolean".to_string(),
            ScalarKind::Signed { min, max } => format!("Signed[{min}, {max}]"),
            ScalarKind::Unsigned { max } => format!("Unsigned[0, {max}]"),
            ScalarKind::Float => "Float".to_string(),
            ScalarKind::Text { max_len: None } => "Text".to_string(),
            ScalarKind::Text { max_len: Some(n) } => format!("Text({n})"),
            ScalarKind::Time(g) => format!("Time({g:?})"),
            ScalarKind::Blob => "Blob".to_string(),
        }
    }

    /// Checks `value` against this descriptor and normalizes it to the
    /// canonical variant for the kind.
    ///
    /// Integers are range checked, times are truncated to the declared
    /// granularity, and text is length checked. Null always passes; the
    /// nullable flag is enforced when the field is written.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        let fail = |value: Value| -> Result<Value> {
            Err(Error::type_conversion(value, self.type_name()))
        };

        match (&self.kind, value) {
            (_, Value::Null) => Ok(Value::Null),
            (ScalarKind::Boolean, Value::Bool(v)) => Ok(Value::Bool(v)),
            (ScalarKind::Boolean, value) => match value.as_u64() {
                Some(v @ (0 | 1)) => Ok(Value::Bool(v == 1)),
                _ => fail(value),
            },
            (ScalarKind::Signed { min, max }, value) => match value.as_i64() {
                Some(v) if v >= *min && v <= *max => Ok(Value::I64(v)),
                _ => fail(value),
            },
            (ScalarKind::Unsigned { max: 1 }, Value::Bool(v)) => Ok(Value::U64(v.into())),
            (ScalarKind::Unsigned { max }, value) => match value.as_u64() {
                Some(v) if v <= *max => Ok(Value::U64(v)),
                _ => fail(value),
            },
            (ScalarKind::Float, Value::F64(v)) => Ok(Value::F64(v)),
            (ScalarKind::Float, Value::I64(v)) => Ok(Value::F64(v as f64)),
            (ScalarKind::Float, Value::U64(v)) => Ok(Value::F64(v as f64)),
            (ScalarKind::Text { max_len }, Value::String(v)) => match max_len {
                Some(n) if v.chars().count() > *n => fail(Value::String(v)),
                _ => Ok(Value::String(v)),
            },
            (ScalarKind::Time(g), Value::Time(v)) => Ok(Value::Time(g.truncate(v)?)),
            (ScalarKind::Blob, Value::Bytes(v)) => Ok(Value::Bytes(v)),
            (_, value) => fail(value),
        }
    }
}
