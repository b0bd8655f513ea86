//! Raw values as they arrive from a driver or a JSON document.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Identifier of a coercion target type.
///
/// Scalar kinds key the canonical format table; `Enum` and `Composite`
/// carry their own rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
    Date,
    DateTime,
    DateTimeOffset,
    Time,
    Duration,
    Guid,
    Char,
    String,
    Chars,
    Binary,
    Json,
    Enum,
    Composite,
}

impl Kind {
    /// Name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::DateTimeOffset => "datetime with offset",
            Self::Time => "time",
            Self::Duration => "duration",
            Self::Guid => "guid",
            Self::Char => "char",
            Self::String => "string",
            Self::Chars => "char sequence",
            Self::Binary => "binary",
            Self::Json => "json",
            Self::Enum => "enum",
            Self::Composite => "composite",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every shape a raw database or JSON value can take before coercion.
///
/// `Null` and `DbNull` are both "absent"; `parse` collapses them to the
/// caller's default.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// NULL reported by the database driver.
    DbNull,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Time(NaiveTime),
    Duration(TimeDelta),
    Guid(Uuid),
    Char(char),
    Text(String),
    Chars(Vec<char>),
    Binary(Vec<u8>),
    Json(serde_json::Value),
}

impl Value {
    /// Kind of the carried value, `None` for the null markers.
    pub fn kind(&self) -> Option<Kind> {
        let kind = match self {
            Self::Null | Self::DbNull => return None,
            Self::Bool(_) => Kind::Bool,
            Self::I8(_) => Kind::I8,
            Self::I16(_) => Kind::I16,
            Self::I32(_) => Kind::I32,
            Self::I64(_) => Kind::I64,
            Self::U8(_) => Kind::U8,
            Self::U16(_) => Kind::U16,
            Self::U32(_) => Kind::U32,
            Self::U64(_) => Kind::U64,
            Self::F32(_) => Kind::F32,
            Self::F64(_) => Kind::F64,
            Self::Decimal(_) => Kind::Decimal,
            Self::Date(_) => Kind::Date,
            Self::DateTime(_) => Kind::DateTime,
            Self::DateTimeOffset(_) => Kind::DateTimeOffset,
            Self::Time(_) => Kind::Time,
            Self::Duration(_) => Kind::Duration,
            Self::Guid(_) => Kind::Guid,
            Self::Char(_) => Kind::Char,
            Self::Text(_) => Kind::String,
            Self::Chars(_) => Kind::Chars,
            Self::Binary(_) => Kind::Binary,
            Self::Json(_) => Kind::Json,
        };
        Some(kind)
    }

    /// Name of the carried type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::DbNull => "database null",
            other => other.kind().map_or("null", Kind::name),
        }
    }

    /// True for `Null` and `DbNull`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::DbNull)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::DbNull => f.write_str("DBNull"),
            Self::Json(node) => write!(f, "{node}"),
            other => match crate::format::serialize(other) {
                Ok(text) => f.write_str(&text),
                Err(_) => write!(f, "{other:?}"),
            },
        }
    }
}

macro_rules! from_native {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

from_native! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    NaiveTime => Time,
    TimeDelta => Duration,
    Uuid => Guid,
    char => Char,
    String => Text,
    Vec<char> => Chars,
    Vec<u8> => Binary,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Binary(value.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
