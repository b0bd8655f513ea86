//! Canonical textual forms.
//!
//! One [`FormatEntry`] per scalar [`Kind`], built on first use and never
//! mutated afterwards. Every `serialize` is the exact inverse of its `parse`.

use std::collections::HashMap;
use std::num::{IntErrorKind, ParseFloatError, ParseIntError};
use std::str::FromStr;
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::value::{Kind, Value};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
pub const TIME_FORMAT: &str = "%H:%M:%S%.f";

const DURATION_PATTERN: &str = "expected [-][d.]hh:mm:ss[.fffffff]";
const SECONDS_PER_DAY: i64 = 86_400;

/// Parse/serialize strategy pair for one kind.
#[derive(Clone, Copy)]
pub struct FormatEntry {
    pub parse: fn(&str) -> Result<Value>,
    pub serialize: fn(&Value) -> Result<String>,
}

macro_rules! entry {
    ($kind:ident, $variant:ident, $parse:expr, fallible |$v:ident| $render:expr) => {
        (
            Kind::$kind,
            FormatEntry {
                parse: $parse,
                serialize: |value| match value {
                    Value::$variant($v) => $render,
                    other => Err(Error::type_mismatch(other.type_name(), Kind::$kind.name())),
                },
            },
        )
    };
    ($kind:ident, $variant:ident, $parse:expr, |$v:ident| $render:expr) => {
        (
            Kind::$kind,
            FormatEntry {
                parse: $parse,
                serialize: |value| match value {
                    Value::$variant($v) => Ok($render),
                    other => Err(Error::type_mismatch(other.type_name(), Kind::$kind.name())),
                },
            },
        )
    };
}

static FORMATS: LazyLock<HashMap<Kind, FormatEntry>> = LazyLock::new(|| {
    HashMap::from([
        entry!(Bool, Bool, parse_bool, |v| if *v { "true" } else { "false" }.to_owned()),
        entry!(I8, I8, |text| parse_int(text, Kind::I8).map(Value::I8), |v| v.to_string()),
        entry!(I16, I16, |text| parse_int(text, Kind::I16).map(Value::I16), |v| v.to_string()),
        entry!(I32, I32, |text| parse_int(text, Kind::I32).map(Value::I32), |v| v.to_string()),
        entry!(I64, I64, |text| parse_int(text, Kind::I64).map(Value::I64), |v| v.to_string()),
        entry!(U8, U8, |text| parse_int(text, Kind::U8).map(Value::U8), |v| v.to_string()),
        entry!(U16, U16, |text| parse_int(text, Kind::U16).map(Value::U16), |v| v.to_string()),
        entry!(U32, U32, |text| parse_int(text, Kind::U32).map(Value::U32), |v| v.to_string()),
        entry!(U64, U64, |text| parse_int(text, Kind::U64).map(Value::U64), |v| v.to_string()),
        entry!(F32, F32, |text| parse_float(text, Kind::F32).map(Value::F32), |v| v.to_string()),
        entry!(F64, F64, |text| parse_float(text, Kind::F64).map(Value::F64), |v| v.to_string()),
        entry!(
            Decimal,
            Decimal,
            |text| Decimal::from_str(text)
                .map(Value::Decimal)
                .map_err(|e| Error::format(text, Kind::Decimal.name(), e)),
            |v| v.to_string()
        ),
        entry!(
            Date,
            Date,
            |text| NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(Value::Date)
                .map_err(|e| Error::format(text, Kind::Date.name(), e)),
            |v| v.format(DATE_FORMAT).to_string()
        ),
        entry!(
            DateTime,
            DateTime,
            |text| NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
                .map(Value::DateTime)
                .map_err(|e| Error::format(text, Kind::DateTime.name(), e)),
            |v| v.format(DATETIME_FORMAT).to_string()
        ),
        entry!(
            DateTimeOffset,
            DateTimeOffset,
            |text| DateTime::parse_from_rfc3339(text)
                .map(Value::DateTimeOffset)
                .map_err(|e| Error::format(text, Kind::DateTimeOffset.name(), e)),
            fallible |v| format_offset_datetime(v)
        ),
        entry!(
            Time,
            Time,
            |text| NaiveTime::parse_from_str(text, TIME_FORMAT)
                .map(Value::Time)
                .map_err(|e| Error::format(text, Kind::Time.name(), e)),
            |v| v.format(TIME_FORMAT).to_string()
        ),
        entry!(
            Duration,
            Duration,
            |text| parse_duration(text).map(Value::Duration),
            |v| format_duration(v)
        ),
        entry!(
            Guid,
            Guid,
            |text| Uuid::parse_str(text)
                .map(Value::Guid)
                .map_err(|e| Error::format(text, Kind::Guid.name(), e)),
            |v| v.hyphenated().to_string()
        ),
        entry!(Char, Char, parse_char, |v| v.to_string()),
        entry!(String, Text, |text| Ok(Value::Text(text.to_owned())), |v| v.clone()),
        entry!(
            Chars,
            Chars,
            |text| Ok(Value::Chars(text.chars().collect())),
            |v| v.iter().collect()
        ),
        entry!(
            Binary,
            Binary,
            |text| STANDARD
                .decode(text)
                .map(Value::Binary)
                .map_err(|e| Error::format(text, Kind::Binary.name(), e)),
            |v| STANDARD.encode(v)
        ),
        entry!(
            Json,
            Json,
            |text| serde_json::from_str(text)
                .map(Value::Json)
                .map_err(|e| Error::structural(Kind::Json.name(), e)),
            |v| v.to_string()
        ),
    ])
});

/// Format entry registered for `kind`, if it is a scalar kind.
pub fn entry(kind: Kind) -> Option<&'static FormatEntry> {
    FORMATS.get(&kind)
}

/// Parse `text` with the canonical parser of `kind`.
pub fn parse(kind: Kind, text: &str) -> Result<Value> {
    let entry = entry(kind).ok_or_else(|| Error::type_mismatch(Kind::String.name(), kind.name()))?;
    (entry.parse)(text)
}

/// Render a value in its canonical textual form.
///
/// Null markers have no textual form and are a type mismatch.
pub fn serialize(value: &Value) -> Result<String> {
    let entry = value
        .kind()
        .and_then(entry)
        .ok_or_else(|| Error::type_mismatch(value.type_name(), Kind::String.name()))?;
    (entry.serialize)(value)
}

/// RFC 3339 offsets have no seconds field, so only whole-minute offsets
/// have a canonical form.
fn format_offset_datetime(value: &DateTime<FixedOffset>) -> Result<String> {
    if value.offset().local_minus_utc() % 60 != 0 {
        return Err(Error::out_of_range(value, Kind::DateTimeOffset.name()));
    }
    Ok(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn parse_bool(text: &str) -> Result<Value> {
    if text.eq_ignore_ascii_case("true") {
        Ok(Value::Bool(true))
    } else if text.eq_ignore_ascii_case("false") {
        Ok(Value::Bool(false))
    } else {
        Err(Error::format(text, Kind::Bool.name(), "expected 'true' or 'false'"))
    }
}

fn parse_int<T>(text: &str, kind: Kind) -> Result<T>
where
    T: FromStr<Err = ParseIntError>,
{
    text.parse().map_err(|e: ParseIntError| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => Error::out_of_range(text, kind.name()),
        _ => Error::format(text, kind.name(), e),
    })
}

fn parse_float<T>(text: &str, kind: Kind) -> Result<T>
where
    T: FromStr<Err = ParseFloatError>,
{
    text.parse()
        .map_err(|e: ParseFloatError| Error::format(text, kind.name(), e))
}

fn parse_char(text: &str) -> Result<Value> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Char(c)),
        _ => Err(Error::format(text, Kind::Char.name(), "expected exactly one character")),
    }
}

/// Render a duration as `[-][d.]hh:mm:ss[.fffffff]`.
///
/// The fraction is omitted when zero, written with seven digits when it is a
/// whole number of 100ns ticks and with nine otherwise.
pub fn format_duration(value: &TimeDelta) -> String {
    let sign = if *value < TimeDelta::zero() { "-" } else { "" };
    let magnitude = value.abs();
    let seconds = magnitude.num_seconds();
    let nanos = magnitude.subsec_nanos();

    let days = seconds / SECONDS_PER_DAY;
    let hours = seconds % SECONDS_PER_DAY / 3_600;
    let minutes = seconds % 3_600 / 60;
    let secs = seconds % 60;

    let mut out = String::from(sign);
    if days > 0 {
        out.push_str(&format!("{days}."));
    }
    out.push_str(&format!("{hours:02}:{minutes:02}:{secs:02}"));
    if nanos != 0 {
        if nanos % 100 == 0 {
            out.push_str(&format!(".{:07}", nanos / 100));
        } else {
            out.push_str(&format!(".{nanos:09}"));
        }
    }
    out
}

/// Parse the constant duration format written by [`format_duration`].
pub fn parse_duration(text: &str) -> Result<TimeDelta> {
    let target = Kind::Duration.name();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let colon = body
        .find(':')
        .ok_or_else(|| Error::format(text, target, DURATION_PATTERN))?;
    let (days, clock) = match body[..colon].find('.') {
        Some(dot) => (
            duration_field(text, &body[..dot], i64::MAX / SECONDS_PER_DAY)?,
            &body[dot + 1..],
        ),
        None => (0, body),
    };

    let mut parts = clock.split(':');
    let (hours, minutes, rest) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(m), Some(s), None) => (h, m, s),
        _ => return Err(Error::format(text, target, DURATION_PATTERN)),
    };
    let (seconds, fraction) = match rest.split_once('.') {
        Some((s, f)) => (s, Some(f)),
        None => (rest, None),
    };

    let hours = duration_field(text, hours, 23)?;
    let minutes = duration_field(text, minutes, 59)?;
    let seconds = duration_field(text, seconds, 59)?;
    let nanos = match fraction {
        None => 0,
        Some(f) if (1..=9).contains(&f.len()) && f.bytes().all(|b| b.is_ascii_digit()) => {
            let digits: u32 = f
                .parse()
                .map_err(|e| Error::format(text, target, e))?;
            digits * 10u32.pow(9 - f.len() as u32)
        }
        Some(_) => return Err(Error::format(text, target, DURATION_PATTERN)),
    };

    let total = (days * SECONDS_PER_DAY)
        .checked_add(hours * 3_600 + minutes * 60 + seconds)
        .ok_or_else(|| Error::out_of_range(text, target))?;
    let delta = TimeDelta::new(total, nanos).ok_or_else(|| Error::out_of_range(text, target))?;
    Ok(if negative { -delta } else { delta })
}

fn duration_field(text: &str, part: &str, max: i64) -> Result<i64> {
    let target = Kind::Duration.name();
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::format(text, target, DURATION_PATTERN));
    }
    match part.parse::<i64>() {
        Ok(value) if value <= max => Ok(value),
        _ => Err(Error::out_of_range(text, target)),
    }
}
