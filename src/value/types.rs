use bson::{Bson, doc};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

use super::pattern::Pattern;

/// Runtime shape of a parameter value.
///
/// `Number` follows IEEE-754 semantics; NaN stands for a number that failed
/// to parse. `InvalidDate` plays the same role for dates.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    String(String),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    InvalidDate,
    Regex(Pattern),
    Array(Vec<Value>),
}

pub type CustomCast = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Target type a parameter value is coerced to.
#[derive(Clone)]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Date,
    Regex,
    /// Arbitrary cast applied to every non-nil formatted value.
    Custom(CustomCast),
}

impl ValueType {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Regex => "regex",
            Self::Custom(_) => "custom",
        }
    }

    /// Looks up a built-in type by its lowercase name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "regex" | "regexp" => Some(Self::Regex),
            _ => None,
        }
    }

    /// Type inferred from the runtime shape of a value. Arrays report their first element.
    #[must_use]
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Number(_) => Self::Number,
            Value::Boolean(_) => Self::Boolean,
            Value::Date(_) | Value::InvalidDate => Self::Date,
            Value::Regex(_) => Self::Regex,
            Value::Array(items) => items.first().map_or(Self::String, Self::infer),
            Value::Null | Value::String(_) => Self::String,
        }
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            (a, b) => a.name() == b.name(),
        }
    }
}

impl Value {
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn is_nan(&self) -> bool {
        matches!(self, Self::Number(n) if n.is_nan())
    }

    /// Nil, NaN or the empty string: the values `default` and `required` treat as missing.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Number(n) => n.is_nan(),
            Self::String(s) => s.is_empty(),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null | Self::InvalidDate => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Date(_) | Self::Regex(_) | Self::Array(_) => true,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_pattern(&self) -> Option<&Pattern> {
        match self {
            Self::Regex(p) => Some(p),
            _ => None,
        }
    }

    /// Numeric view used by comparisons: numbers as-is, dates as epoch milliseconds,
    /// booleans as 0/1 and numeric strings parsed. `None` when no numeric reading exists.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            #[allow(clippy::cast_precision_loss)]
            Self::Date(d) => Some(d.timestamp_millis() as f64),
            Self::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::String(s) => Some(super::coerce::parse_number(s)),
            Self::Null | Self::InvalidDate | Self::Regex(_) | Self::Array(_) => None,
        }
    }

    /// Length as seen by `minlength`/`maxlength`: characters of a string or items of an array.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.chars().count()),
            Self::Array(items) => Some(items.len()),
            _ => None,
        }
    }

    /// The value rendered the way a string cast renders it.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::String(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Boolean(b) => b.to_string(),
            Self::Date(d) => d.to_rfc3339_opts(SecondsFormat::Millis, true),
            Self::InvalidDate => "Invalid Date".to_string(),
            Self::Regex(p) => p.to_string(),
            Self::Array(items) => items.iter().map(Self::to_text).collect::<Vec<_>>().join(","),
        }
    }

    /// Store-facing BSON representation.
    #[must_use]
    pub fn to_bson(&self) -> Bson {
        match self {
            Self::Null | Self::InvalidDate => Bson::Null,
            Self::String(s) => Bson::String(s.clone()),
            Self::Number(n) => number_to_bson(*n),
            Self::Boolean(b) => Bson::Boolean(*b),
            Self::Date(d) => Bson::DateTime(bson::DateTime::from_millis(d.timestamp_millis())),
            Self::Regex(p) => Bson::Document(doc! { "$regex": p.source(), "$options": p.flags() }),
            Self::Array(items) => Bson::Array(items.iter().map(Self::to_bson).collect()),
        }
    }
}

/// Integral numbers become `Int32`/`Int64` when they fit, everything else `Double`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn number_to_bson(n: f64) -> Bson {
    if n.is_finite() && n.fract() == 0.0 {
        if n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX) {
            return Bson::Int32(n as i32);
        }
        if n >= i64::MIN as f64 && n < i64::MAX as f64 {
            return Bson::Int64(n as i64);
        }
    }
    Bson::Double(n)
}

#[allow(clippy::cast_possible_truncation)]
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<Value> for Bson {
    fn from(v: Value) -> Self {
        v.to_bson()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::String(s) => serializer.serialize_str(s),
            #[allow(clippy::cast_possible_truncation)]
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Date(_) | Self::InvalidDate | Self::Regex(_) => {
                serializer.serialize_str(&self.to_text())
            }
            Self::Array(items) => serializer.collect_seq(items),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

impl From<Pattern> for Value {
    fn from(p: Pattern) -> Self {
        Self::Regex(p)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_like_casts() {
        assert_eq!(Value::from(23).to_text(), "23");
        assert_eq!(Value::from(1.5).to_text(), "1.5");
        assert_eq!(Value::Number(f64::NAN).to_text(), "NaN");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_text(), "-Infinity");
    }

    #[test]
    fn bson_numbers_pick_narrowest_integer() {
        assert_eq!(Value::from(10).to_bson(), Bson::Int32(10));
        assert_eq!(Value::from(5_000_000_000_i64).to_bson(), Bson::Int64(5_000_000_000));
        assert_eq!(Value::from(0.5).to_bson(), Bson::Double(0.5));
    }

    #[test]
    fn regex_to_bson_uses_operator_document() {
        let v = Value::Regex(Pattern::new("abc", true).unwrap());
        assert_eq!(v.to_bson(), Bson::Document(doc! { "$regex": "abc", "$options": "i" }));
    }

    #[test]
    fn blank_and_truthy() {
        assert!(Value::Null.is_blank());
        assert!(Value::from("").is_blank());
        assert!(Value::Number(f64::NAN).is_blank());
        assert!(!Value::from(0).is_blank());
        assert!(!Value::from(0).is_truthy());
        assert!(Value::from("x").is_truthy());
    }

    #[test]
    fn infer_from_first_element() {
        assert_eq!(ValueType::infer(&Value::from(vec![1, 2])), ValueType::Number);
        assert_eq!(ValueType::infer(&Value::from(true)), ValueType::Boolean);
        assert_eq!(ValueType::infer(&Value::Null), ValueType::String);
    }
}
