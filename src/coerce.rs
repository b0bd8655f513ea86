//! Type coercion dispatcher.
//!
//! [`parse`] turns a raw [`Value`] into a typed value, [`serialize`] renders a
//! typed value in its canonical text. Target types implement [`FromValue`];
//! scalars take their text rules from the format table, enums are declared
//! with [`sql_enum!`](crate::sql_enum) and composites are wrapped in [`Json`].

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::format;
use crate::value::{Kind, Value};

const SECONDS_PER_DAY: i64 = 86_400;

/// A type a raw [`Value`] can be coerced into.
pub trait FromValue: Sized {
    /// Identifier of the underlying, non-nullable type.
    const KIND: Kind;

    /// Type name used in error messages.
    fn type_name() -> &'static str {
        Self::KIND.name()
    }

    /// Take a native scalar: identity when the kinds match, widening otherwise.
    fn from_native(value: Value) -> Result<Self>;

    /// Parse the canonical text of this type.
    fn from_text(text: &str) -> Result<Self> {
        Self::from_native(format::parse(Self::KIND, text)?)
    }

    /// Deserialize a non-null JSON node.
    fn from_json(node: serde_json::Value) -> Result<Self>;
}

/// A type that can be turned into a [`Value`], e.g. for query parameters.
pub trait ToValue {
    fn to_value(&self) -> Result<Value>;
}

/// Coerce `value` into `T`.
///
/// Null markers and JSON `null` yield `default`; that is the only lossy path.
pub fn parse<T: FromValue>(value: impl Into<Value>, default: T) -> Result<T> {
    match value.into() {
        Value::Null | Value::DbNull => Ok(default),
        value if value.kind() == Some(T::KIND) => T::from_native(value),
        Value::Chars(chars) => T::from_text(&chars.into_iter().collect::<String>()),
        Value::Text(text) => T::from_text(&text),
        Value::Json(serde_json::Value::Null) => Ok(default),
        Value::Json(node) => T::from_json(node),
        native => T::from_native(native),
    }
}

/// [`parse`] with `T::default()` as the fallback.
pub fn parse_or_default<T: FromValue + Default>(value: impl Into<Value>) -> Result<T> {
    parse(value, T::default())
}

/// Render `value` in its canonical textual form.
pub fn serialize<T: ToValue + ?Sized>(value: &T) -> Result<String> {
    format::serialize(&value.to_value()?)
}

fn from_json_node<T: FromValue + DeserializeOwned>(node: serde_json::Value) -> Result<T> {
    serde_json::from_value(node).map_err(|e| Error::structural(T::type_name(), e))
}

fn integral_float(v: f64) -> Option<i128> {
    (v.is_finite() && v.fract() == 0.0 && v.abs() < 1.0e38).then_some(v as i128)
}

fn to_i128(value: &Value, target: &'static str) -> Result<i128> {
    let out_of_range = || Error::out_of_range(value, target);
    match *value {
        Value::Bool(v) => Ok(i128::from(v)),
        Value::I8(v) => Ok(v.into()),
        Value::I16(v) => Ok(v.into()),
        Value::I32(v) => Ok(v.into()),
        Value::I64(v) => Ok(v.into()),
        Value::U8(v) => Ok(v.into()),
        Value::U16(v) => Ok(v.into()),
        Value::U32(v) => Ok(v.into()),
        Value::U64(v) => Ok(v.into()),
        Value::F32(v) => integral_float(f64::from(v)).ok_or_else(out_of_range),
        Value::F64(v) => integral_float(v).ok_or_else(out_of_range),
        Value::Decimal(d) if d.fract().is_zero() => d.to_i128().ok_or_else(out_of_range),
        Value::Decimal(_) => Err(out_of_range()),
        _ => Err(Error::type_mismatch(value.type_name(), target)),
    }
}

/// Widen to `f64`, rejecting integers that do not convert exactly and
/// decimals whose shortest float text reads back as a different decimal.
fn to_f64(value: &Value, target: &'static str) -> Result<f64> {
    let out_of_range = || Error::out_of_range(value, target);
    match *value {
        Value::F32(v) => Ok(f64::from(v)),
        Value::F64(v) => Ok(v),
        Value::Decimal(d) => d
            .to_f64()
            .filter(|f| f.to_string().parse::<Decimal>().is_ok_and(|back| back == d))
            .ok_or_else(out_of_range),
        _ => {
            let wide = to_i128(value, target)?;
            let float = wide as f64;
            if float as i128 == wide {
                Ok(float)
            } else {
                Err(out_of_range())
            }
        }
    }
}

macro_rules! integer {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const KIND: Kind = Kind::$kind;

                fn from_native(value: Value) -> Result<Self> {
                    if let Value::$kind(v) = value {
                        return Ok(v);
                    }
                    let wide = to_i128(&value, Self::type_name())?;
                    <$ty>::try_from(wide).map_err(|_| Error::out_of_range(&value, Self::type_name()))
                }

                fn from_json(node: serde_json::Value) -> Result<Self> {
                    from_json_node(node)
                }
            }
        )*
    };
}

integer! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
}

impl FromValue for f64 {
    const KIND: Kind = Kind::F64;

    fn from_native(value: Value) -> Result<Self> {
        to_f64(&value, Self::type_name())
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        from_json_node(node)
    }
}

impl FromValue for f32 {
    const KIND: Kind = Kind::F32;

    fn from_native(value: Value) -> Result<Self> {
        if let Value::F32(v) = value {
            return Ok(v);
        }
        let wide = to_f64(&value, Self::type_name())?;
        let narrow = wide as f32;
        if f64::from(narrow) == wide || (narrow.is_nan() && wide.is_nan()) {
            Ok(narrow)
        } else {
            Err(Error::out_of_range(&value, Self::type_name()))
        }
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        from_json_node(node)
    }
}

impl FromValue for Decimal {
    const KIND: Kind = Kind::Decimal;

    fn from_native(value: Value) -> Result<Self> {
        let converted = match value {
            Value::Decimal(d) => return Ok(d),
            Value::F32(v) => Decimal::from_f32(v),
            Value::F64(v) => Decimal::from_f64(v),
            ref other => Decimal::from_i128(to_i128(other, Self::type_name())?),
        };
        converted.ok_or_else(|| Error::out_of_range(&value, Self::type_name()))
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        from_json_node(node)
    }
}

impl FromValue for bool {
    const KIND: Kind = Kind::Bool;

    fn from_native(value: Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::F32(v) => Ok(v != 0.0),
            Value::F64(v) => Ok(v != 0.0),
            Value::Decimal(d) => Ok(!d.is_zero()),
            ref other => to_i128(other, Self::type_name()).map(|v| v != 0),
        }
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        from_json_node(node)
    }
}

impl FromValue for char {
    const KIND: Kind = Kind::Char;

    fn from_native(value: Value) -> Result<Self> {
        if let Value::Char(c) = value {
            return Ok(c);
        }
        let code = to_i128(&value, Self::type_name())?;
        u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| Error::out_of_range(&value, Self::type_name()))
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        from_json_node(node)
    }
}

impl FromValue for String {
    const KIND: Kind = Kind::String;

    fn from_native(value: Value) -> Result<Self> {
        match value {
            Value::Text(text) => Ok(text),
            other => format::serialize(&other),
        }
    }

    fn from_text(text: &str) -> Result<Self> {
        Ok(text.to_owned())
    }

    /// JSON strings are unescaped; any other node is rendered as its literal
    /// text with surrounding quotes stripped.
    fn from_json(node: serde_json::Value) -> Result<Self> {
        match node {
            serde_json::Value::String(text) => Ok(text),
            other => Ok(other.to_string().trim_matches('"').to_owned()),
        }
    }
}

impl FromValue for Vec<char> {
    const KIND: Kind = Kind::Chars;

    fn from_native(value: Value) -> Result<Self> {
        match value {
            Value::Chars(chars) => Ok(chars),
            Value::Char(c) => Ok(vec![c]),
            other => format::serialize(&other).map(|text| text.chars().collect()),
        }
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        match node {
            serde_json::Value::String(text) => Ok(text.chars().collect()),
            other => from_json_node(other),
        }
    }
}

impl FromValue for Vec<u8> {
    const KIND: Kind = Kind::Binary;

    fn from_native(value: Value) -> Result<Self> {
        match value {
            Value::Binary(bytes) => Ok(bytes),
            Value::Guid(guid) => Ok(guid.as_bytes().to_vec()),
            other => Err(Error::type_mismatch(other.type_name(), Self::type_name())),
        }
    }

    /// Binary travels through JSON as base64 text.
    fn from_json(node: serde_json::Value) -> Result<Self> {
        match node {
            serde_json::Value::String(text) => Self::from_text(&text),
            other => from_json_node(other),
        }
    }
}

impl FromValue for Uuid {
    const KIND: Kind = Kind::Guid;

    fn from_native(value: Value) -> Result<Self> {
        match value {
            Value::Guid(guid) => Ok(guid),
            Value::Binary(bytes) => Uuid::from_slice(&bytes)
                .map_err(|e| Error::format(format!("<{} bytes>", bytes.len()), Self::type_name(), e)),
            other => Err(Error::type_mismatch(other.type_name(), Self::type_name())),
        }
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        from_json_node(node)
    }
}

impl FromValue for NaiveDate {
    const KIND: Kind = Kind::Date;

    fn from_native(value: Value) -> Result<Self> {
        match value {
            Value::Date(date) => Ok(date),
            Value::DateTime(dt) => Ok(dt.date()),
            Value::DateTimeOffset(dt) => Ok(dt.date_naive()),
            other => Err(Error::type_mismatch(other.type_name(), Self::type_name())),
        }
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        from_json_node(node)
    }
}

impl FromValue for NaiveDateTime {
    const KIND: Kind = Kind::DateTime;

    fn from_native(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            Value::Date(date) => Ok(date.and_time(NaiveTime::MIN)),
            Value::DateTimeOffset(dt) => Ok(dt.naive_local()),
            other => Err(Error::type_mismatch(other.type_name(), Self::type_name())),
        }
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        from_json_node(node)
    }
}

impl FromValue for DateTime<FixedOffset> {
    const KIND: Kind = Kind::DateTimeOffset;

    /// Offset-less values are taken as UTC.
    fn from_native(value: Value) -> Result<Self> {
        match value {
            Value::DateTimeOffset(dt) => Ok(dt),
            Value::DateTime(dt) => Ok(dt.and_utc().fixed_offset()),
            Value::Date(date) => Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset()),
            other => Err(Error::type_mismatch(other.type_name(), Self::type_name())),
        }
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        from_json_node(node)
    }
}

impl FromValue for NaiveTime {
    const KIND: Kind = Kind::Time;

    fn from_native(value: Value) -> Result<Self> {
        match value {
            Value::Time(time) => Ok(time),
            Value::DateTime(dt) => Ok(dt.time()),
            Value::DateTimeOffset(dt) => Ok(dt.time()),
            Value::Duration(delta) => {
                let seconds = delta.num_seconds();
                let in_day = delta >= TimeDelta::zero() && seconds < SECONDS_PER_DAY;
                in_day
                    .then(|| {
                        NaiveTime::from_num_seconds_from_midnight_opt(
                            seconds as u32,
                            delta.subsec_nanos() as u32,
                        )
                    })
                    .flatten()
                    .ok_or_else(|| Error::out_of_range(format::format_duration(&delta), Self::type_name()))
            }
            other => Err(Error::type_mismatch(other.type_name(), Self::type_name())),
        }
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        from_json_node(node)
    }
}

impl FromValue for TimeDelta {
    const KIND: Kind = Kind::Duration;

    fn from_native(value: Value) -> Result<Self> {
        match value {
            Value::Duration(delta) => Ok(delta),
            Value::Time(time) => Ok(time.signed_duration_since(NaiveTime::MIN)),
            other => Err(Error::type_mismatch(other.type_name(), Self::type_name())),
        }
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        match node {
            serde_json::Value::String(text) => Self::from_text(&text),
            other => Err(Error::structural_msg(
                Self::type_name(),
                format!("expected a duration string, found {other}"),
            )),
        }
    }
}

impl FromValue for serde_json::Value {
    const KIND: Kind = Kind::Json;

    fn from_native(value: Value) -> Result<Self> {
        match value {
            Value::Json(node) => Ok(node),
            Value::Bool(v) => Ok(v.into()),
            Value::F32(v) => json_number(f64::from(v), &value),
            Value::F64(v) => json_number(v, &value),
            Value::I8(_)
            | Value::I16(_)
            | Value::I32(_)
            | Value::I64(_)
            | Value::U8(_)
            | Value::U16(_)
            | Value::U32(_)
            | Value::U64(_) => {
                let wide = to_i128(&value, Self::type_name())?;
                i64::try_from(wide)
                    .map(Into::into)
                    .or_else(|_| u64::try_from(wide).map(Into::into))
                    .map_err(|_| Error::out_of_range(&value, Self::type_name()))
            }
            other => format::serialize(&other).map(serde_json::Value::String),
        }
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        Ok(node)
    }
}

fn json_number(v: f64, value: &Value) -> Result<serde_json::Value> {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .ok_or_else(|| Error::out_of_range(value, Kind::Json.name()))
}

impl<T: FromValue> FromValue for Option<T> {
    const KIND: Kind = T::KIND;

    fn type_name() -> &'static str {
        T::type_name()
    }

    fn from_native(value: Value) -> Result<Self> {
        T::from_native(value).map(Some)
    }

    fn from_text(text: &str) -> Result<Self> {
        T::from_text(text).map(Some)
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        T::from_json(node).map(Some)
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Result<Value> {
        Ok(self.clone())
    }
}

impl ToValue for str {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Text(self.to_owned()))
    }
}

impl ToValue for [u8] {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Binary(self.to_vec()))
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Result<Value> {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Result<Value> {
        match self {
            Some(value) => value.to_value(),
            None => Ok(Value::Null),
        }
    }
}

macro_rules! to_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Result<Value> {
                    Ok(Value::from(self.clone()))
                }
            }
        )*
    };
}

to_value!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    Decimal,
    NaiveDate,
    NaiveDateTime,
    DateTime<FixedOffset>,
    NaiveTime,
    TimeDelta,
    Uuid,
    char,
    String,
    Vec<char>,
    Vec<u8>,
    serde_json::Value,
);

/// Composite value carried as a JSON document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: DeserializeOwned> FromValue for Json<T> {
    const KIND: Kind = Kind::Composite;

    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn from_native(value: Value) -> Result<Self> {
        Err(Error::type_mismatch(value.type_name(), Self::type_name()))
    }

    fn from_text(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map(Json)
            .map_err(|e| Error::structural(Self::type_name(), e))
    }

    fn from_json(node: serde_json::Value) -> Result<Self> {
        serde_json::from_value(node)
            .map(Json)
            .map_err(|e| Error::structural(Self::type_name(), e))
    }
}

impl<T: Serialize> ToValue for Json<T> {
    fn to_value(&self) -> Result<Value> {
        serde_json::to_value(&self.0)
            .map(Value::Json)
            .map_err(|e| Error::structural(std::any::type_name::<T>(), e))
    }
}

/// Enumerated type with a closed set of declared members.
///
/// Implemented by [`sql_enum!`](crate::sql_enum). Coercion only yields
/// declared members; any other name or ordinal is out of range.
pub trait SqlEnum: Copy + PartialEq + 'static {
    const NAME: &'static str;
    /// `(name, ordinal, member)` in declaration order.
    const MEMBERS: &'static [(&'static str, i64, Self)];

    /// Member whose name matches, ignoring ASCII case.
    fn from_name(name: &str) -> Option<Self> {
        Self::MEMBERS
            .iter()
            .find(|(member, _, _)| member.eq_ignore_ascii_case(name))
            .map(|&(_, _, value)| value)
    }

    fn from_ordinal(ordinal: i64) -> Option<Self> {
        Self::MEMBERS
            .iter()
            .find(|(_, member, _)| *member == ordinal)
            .map(|&(_, _, value)| value)
    }

    fn name(self) -> &'static str {
        Self::MEMBERS
            .iter()
            .find(|(_, _, value)| *value == self)
            .map_or("", |&(name, _, _)| name)
    }

    fn ordinal(self) -> i64 {
        Self::MEMBERS
            .iter()
            .find(|(_, _, value)| *value == self)
            .map_or(0, |&(_, ordinal, _)| ordinal)
    }
}

#[doc(hidden)]
pub fn enum_from_text<E: SqlEnum>(text: &str) -> Result<E> {
    E::from_name(text)
        .or_else(|| text.parse::<i64>().ok().and_then(E::from_ordinal))
        .ok_or_else(|| Error::out_of_range(text, E::NAME))
}

#[doc(hidden)]
pub fn enum_from_native<E: SqlEnum>(value: Value) -> Result<E> {
    let ordinal = to_i128(&value, E::NAME)?;
    i64::try_from(ordinal)
        .ok()
        .and_then(E::from_ordinal)
        .ok_or_else(|| Error::out_of_range(&value, E::NAME))
}

#[doc(hidden)]
pub fn enum_from_json<E: SqlEnum>(node: serde_json::Value) -> Result<E> {
    match node {
        serde_json::Value::String(text) => enum_from_text(&text),
        serde_json::Value::Number(number) => number
            .as_i64()
            .and_then(E::from_ordinal)
            .ok_or_else(|| Error::out_of_range(&number, E::NAME)),
        other => Err(Error::structural_msg(
            E::NAME,
            format!("expected a member name or ordinal, found {other}"),
        )),
    }
}

/// Declare an enum whose members coerce from their name or ordinal.
///
/// ```
/// rust_sql::sql_enum! {
///     pub enum Status {
///         Draft = 0,
///         Published = 1,
///     }
/// }
///
/// assert_eq!(rust_sql::parse("published", Status::Draft).unwrap(), Status::Published);
/// assert!(rust_sql::parse("3", Status::Draft).is_err());
/// ```
#[macro_export]
macro_rules! sql_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $ordinal:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant = $ordinal
            ),+
        }

        impl $crate::SqlEnum for $name {
            const NAME: &'static str = stringify!($name);
            const MEMBERS: &'static [(&'static str, i64, Self)] = &[
                $((stringify!($variant), $ordinal, $name::$variant)),+
            ];
        }

        impl $crate::FromValue for $name {
            const KIND: $crate::Kind = $crate::Kind::Enum;

            fn type_name() -> &'static str {
                <Self as $crate::SqlEnum>::NAME
            }

            fn from_native(value: $crate::Value) -> $crate::Result<Self> {
                $crate::coerce::enum_from_native(value)
            }

            fn from_text(text: &str) -> $crate::Result<Self> {
                $crate::coerce::enum_from_text(text)
            }

            fn from_json(node: $crate::serde_json::Value) -> $crate::Result<Self> {
                $crate::coerce::enum_from_json(node)
            }
        }

        impl $crate::ToValue for $name {
            fn to_value(&self) -> $crate::Result<$crate::Value> {
                Ok($crate::Value::Text(
                    <Self as $crate::SqlEnum>::name(*self).to_owned(),
                ))
            }
        }
    };
}
