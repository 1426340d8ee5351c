//! Casts between value shapes.
//!
//! Every cast is idempotent: casting an already-cast value returns it unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::pattern::Pattern;
use super::types::{Value, ValueType};

/// Casts a non-nil value to `ty`. Nil passes through untouched.
#[must_use]
pub fn cast(value: Value, ty: &ValueType) -> Value {
    if value.is_nil() {
        return value;
    }
    match ty {
        ValueType::String => to_string(value),
        ValueType::Number => to_number(value),
        ValueType::Boolean => to_boolean(value),
        ValueType::Date => to_date(value),
        ValueType::Regex => to_regex(value),
        ValueType::Custom(f) => f(value),
    }
}

fn to_string(value: Value) -> Value {
    match value {
        Value::String(_) => value,
        other => Value::String(other.to_text()),
    }
}

fn to_number(value: Value) -> Value {
    match value {
        Value::Number(_) => value,
        Value::InvalidDate => Value::Number(f64::NAN),
        Value::Array(ref items) if items.is_empty() => Value::Number(0.0),
        other => Value::Number(other.as_f64().unwrap_or(f64::NAN)),
    }
}

fn to_boolean(value: Value) -> Value {
    match value {
        Value::Boolean(_) => value,
        Value::String(s) => Value::Boolean(!matches!(s.as_str(), "" | "false" | "0")),
        other => Value::Boolean(other.is_truthy()),
    }
}

fn to_date(value: Value) -> Value {
    match value {
        Value::Date(_) | Value::InvalidDate => value,
        Value::Number(n) => date_from_millis(n),
        Value::String(s) => parse_date(&s),
        _ => Value::InvalidDate,
    }
}

fn to_regex(value: Value) -> Value {
    match value {
        Value::Regex(_) => value,
        other => Value::Regex(Pattern::lenient(&other.to_text(), true)),
    }
}

/// Parses a number the way a dynamic numeric cast does: blank is zero, garbage is NaN.
#[must_use]
pub fn parse_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        #[allow(clippy::cast_precision_loss)]
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |v| v as f64);
    }
    // Rust accepts "inf"/"nan" spellings; those are not numbers here.
    if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

#[allow(clippy::cast_possible_truncation)]
fn date_from_millis(ms: f64) -> Value {
    if !ms.is_finite() {
        return Value::InvalidDate;
    }
    Utc.timestamp_millis_opt(ms as i64).single().map_or(Value::InvalidDate, Value::Date)
}

/// Parses a date string. Digits-only strings longer than a year are epoch milliseconds.
#[must_use]
pub fn parse_date(s: &str) -> Value {
    let t = s.trim();
    if t.is_empty() {
        return Value::InvalidDate;
    }
    if t.len() > 4 && t.chars().all(|c| c.is_ascii_digit()) {
        return date_from_millis(parse_number(t));
    }
    if let Ok(d) = DateTime::parse_from_rfc3339(t) {
        return Value::Date(d.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(n) = NaiveDateTime::parse_from_str(t, fmt) {
            return Value::Date(n.and_utc());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return midnight(d);
    }
    let mut parts = t.splitn(2, '-');
    let year = parts.next().filter(|y| y.len() == 4).and_then(|y| y.parse::<i32>().ok());
    let month = match parts.next() {
        Some(m) if m.len() == 2 => m.parse::<u32>().ok(),
        Some(_) => return Value::InvalidDate,
        None => Some(1),
    };
    match (year, month) {
        (Some(y), Some(m)) => NaiveDate::from_ymd_opt(y, m, 1).map_or(Value::InvalidDate, midnight),
        _ => Value::InvalidDate,
    }
}

fn midnight(d: NaiveDate) -> Value {
    d.and_hms_opt(0, 0, 0).map_or(Value::InvalidDate, |n| Value::Date(n.and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Value {
        Value::Date(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap())
    }

    #[test]
    fn numbers() {
        assert_eq!(cast("23".into(), &ValueType::Number), Value::Number(23.0));
        assert_eq!(cast(" 1e3 ".into(), &ValueType::Number), Value::Number(1000.0));
        assert_eq!(cast("0x10".into(), &ValueType::Number), Value::Number(16.0));
        assert!(cast("abc".into(), &ValueType::Number).is_nan());
        assert!(cast("inf".into(), &ValueType::Number).is_nan());
    }

    #[test]
    fn booleans() {
        for s in ["false", "0", ""] {
            assert_eq!(cast(s.into(), &ValueType::Boolean), Value::Boolean(false));
        }
        assert_eq!(cast("1".into(), &ValueType::Boolean), Value::Boolean(true));
        assert_eq!(cast("no".into(), &ValueType::Boolean), Value::Boolean(true));
        assert_eq!(cast(Value::from(0), &ValueType::Boolean), Value::Boolean(false));
    }

    #[test]
    fn dates() {
        assert_eq!(cast("2016-04-18".into(), &ValueType::Date), ymd(2016, 4, 18));
        assert_eq!(cast("2016".into(), &ValueType::Date), ymd(2016, 1, 1));
        assert_eq!(cast("2016-04".into(), &ValueType::Date), ymd(2016, 4, 1));
        assert_eq!(cast("86400000".into(), &ValueType::Date), ymd(1970, 1, 2));
        assert_eq!(cast("not a date".into(), &ValueType::Date), Value::InvalidDate);
    }

    #[test]
    fn casts_are_idempotent() {
        for (raw, ty) in [
            (Value::from("12"), ValueType::Number),
            (Value::from("abc"), ValueType::Regex),
            (Value::from("2016-04-18T10:05:00Z"), ValueType::Date),
            (Value::from("0"), ValueType::Boolean),
            (Value::from(12), ValueType::String),
        ] {
            let once = cast(raw, &ty);
            assert_eq!(cast(once.clone(), &ty), once);
        }
    }
}
