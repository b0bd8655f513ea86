//! Round-trip properties of the canonical text forms.
//!
//! For every scalar kind, `parse(serialize(v)) == v`, and null markers
//! always collapse to the supplied default.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_sql::{parse, serialize, sql_enum, FromValue, Json, SqlEnum, ToValue, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

sql_enum! {
    enum Level {
        Trace = 0,
        Debug = 1,
        Info = 2,
        Warn = 3,
        Error = 4,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Reading {
    sensor: String,
    values: Vec<f64>,
    ok: bool,
}

fn round_trip<T>(value: T, default: T) -> Result<(), TestCaseError>
where
    T: FromValue + ToValue + PartialEq + std::fmt::Debug,
{
    let text = serialize(&value).map_err(|e| TestCaseError::fail(e.to_string()))?;
    let back = parse(text.as_str(), default).map_err(|e| TestCaseError::fail(format!("{text}: {e}")))?;
    prop_assert_eq!(back, value, "text was {}", text);
    Ok(())
}

// =============================================================================
// Strategies
// =============================================================================

// Keep years within four digits even after applying any offset.
fn date() -> impl Strategy<Value = NaiveDate> {
    (366i32..=3_651_000).prop_filter_map("valid day", NaiveDate::from_num_days_from_ce_opt)
}

fn time() -> impl Strategy<Value = NaiveTime> {
    (0u32..86_400, 0u32..1_000_000_000).prop_filter_map("valid time", |(secs, nanos)| {
        NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
    })
}

fn datetime() -> impl Strategy<Value = NaiveDateTime> {
    (date(), time()).prop_map(|(d, t)| d.and_time(t))
}

// Whole-minute offsets only; RFC 3339 text has no seconds field.
fn datetime_offset() -> impl Strategy<Value = DateTime<FixedOffset>> {
    (datetime(), -14 * 60..=14 * 60i32).prop_filter_map("valid offset", |(naive, minutes)| {
        FixedOffset::east_opt(minutes * 60).map(|offset| offset.from_utc_datetime(&naive))
    })
}

fn duration() -> impl Strategy<Value = TimeDelta> {
    (-9_000_000_000_000_000i64..9_000_000_000_000_000, 0u32..1_000_000_000)
        .prop_filter_map("valid duration", |(secs, nanos)| TimeDelta::new(secs, nanos))
}

fn decimal() -> impl Strategy<Value = Decimal> {
    (any::<i64>(), 0u32..=28).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

fn level() -> impl Strategy<Value = Level> {
    prop::sample::select(Level::MEMBERS.iter().map(|&(_, _, member)| member).collect::<Vec<_>>())
}

fn reading() -> impl Strategy<Value = Reading> {
    (
        ".{0,12}",
        prop::collection::vec(-1.0e9f64..1.0e9, 0..6),
        any::<bool>(),
    )
        .prop_map(|(sensor, values, ok)| Reading { sensor, values, ok })
}

// =============================================================================
// Scalar round trips
// =============================================================================

proptest! {
    #[test]
    fn integers_round_trip(a in any::<i8>(), b in any::<i16>(), c in any::<i32>(), d in any::<i64>()) {
        round_trip(a, 0)?;
        round_trip(b, 0)?;
        round_trip(c, 0)?;
        round_trip(d, 0)?;
    }

    #[test]
    fn unsigned_round_trip(a in any::<u8>(), b in any::<u16>(), c in any::<u32>(), d in any::<u64>()) {
        round_trip(a, 0)?;
        round_trip(b, 0)?;
        round_trip(c, 0)?;
        round_trip(d, 0)?;
    }

    #[test]
    fn floats_round_trip(
        a in any::<f32>().prop_filter("finite", |v| v.is_finite()),
        b in any::<f64>().prop_filter("finite", |v| v.is_finite()),
    ) {
        round_trip(a, 0.0)?;
        round_trip(b, 0.0)?;
    }

    #[test]
    fn bool_and_char_round_trip(flag in any::<bool>(), c in any::<char>()) {
        round_trip(flag, !flag)?;
        round_trip(c, ' ')?;
    }

    #[test]
    fn decimal_round_trip(value in decimal()) {
        round_trip(value, Decimal::ZERO)?;
        let text = serialize(&value).unwrap();
        prop_assert_eq!(parse(text.as_str(), Decimal::ZERO).unwrap().scale(), value.scale());
    }

    #[test]
    fn temporal_round_trip(
        d in date(),
        t in time(),
        dt in datetime(),
        dto in datetime_offset(),
        span in duration(),
    ) {
        round_trip(d, NaiveDate::MIN)?;
        round_trip(t, NaiveTime::MIN)?;
        round_trip(dt, NaiveDateTime::MIN)?;
        round_trip(dto, DateTime::default())?;
        round_trip(span, TimeDelta::zero())?;
    }

    #[test]
    fn sub_minute_offsets_are_rejected(dt in datetime(), minutes in -14 * 60..14 * 60i32, seconds in 1..60i32) {
        let offset = FixedOffset::east_opt(minutes * 60 + seconds).unwrap();
        let value = offset.from_utc_datetime(&dt);
        prop_assert!(serialize(&value).is_err());
    }

    #[test]
    fn guid_round_trip(bytes in any::<[u8; 16]>()) {
        round_trip(Uuid::from_bytes(bytes), Uuid::nil())?;
    }

    #[test]
    fn text_round_trip(s in any::<String>(), chars in prop::collection::vec(any::<char>(), 0..32)) {
        round_trip(s, String::new())?;
        round_trip(chars, Vec::new())?;
    }

    #[test]
    fn binary_round_trip(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        round_trip(bytes, vec![0xFF])?;
    }

    #[test]
    fn enum_round_trip(member in level()) {
        round_trip(member, Level::Trace)?;
        prop_assert_eq!(parse(member.ordinal().to_string().as_str(), Level::Trace).unwrap(), member);
        prop_assert_eq!(parse(member.name().to_lowercase().as_str(), Level::Trace).unwrap(), member);
    }

    #[test]
    fn composite_round_trip(value in reading()) {
        round_trip(Json(value.clone()), Json(Reading { sensor: String::new(), values: Vec::new(), ok: false }))?;
    }

    #[test]
    fn undeclared_ordinals_are_rejected(ordinal in 5i64..) {
        prop_assert!(parse(ordinal, Level::Trace).is_err());
        prop_assert!(parse(ordinal.to_string().as_str(), Level::Trace).is_err());
    }

    #[test]
    fn null_markers_yield_default(d in any::<i64>(), s in ".*") {
        prop_assert_eq!(parse(Value::Null, d).unwrap(), d);
        prop_assert_eq!(parse(Value::DbNull, d).unwrap(), d);
        prop_assert_eq!(parse(Value::DbNull, s.clone()).unwrap(), s.clone());
        prop_assert_eq!(parse(Value::Json(serde_json::Value::Null), Some(s.clone())).unwrap(), Some(s));
    }
}
