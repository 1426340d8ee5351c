use bson::Document;
use std::fmt;
use std::sync::Arc;

use super::Param;
use crate::schema::Schema;
use crate::value::{Pattern, Value, ValueType};

/// Option names with built-in meaning.
pub mod keys {
    pub const TYPE: &str = "type";
    pub const PATHS: &str = "paths";
    pub const BIND_TO: &str = "bindTo";
    pub const MULTIPLE: &str = "multiple";
    pub const SEPARATOR: &str = "separator";
    pub const OPERATOR: &str = "operator";
    pub const PARSE: &str = "parse";
    pub const SET: &str = "set";
    pub const GET: &str = "get";

    pub const DEFAULT: &str = "default";
    pub const NORMALIZE: &str = "normalize";
    pub const LOWERCASE: &str = "lowercase";
    pub const UPPERCASE: &str = "uppercase";
    pub const TRIM: &str = "trim";

    pub const REQUIRED: &str = "required";
    pub const MIN: &str = "min";
    pub const MAX: &str = "max";
    pub const MINLENGTH: &str = "minlength";
    pub const MAXLENGTH: &str = "maxlength";
    pub const ENUM: &str = "enum";
    pub const MATCH: &str = "match";

    pub const GEOJSON: &str = "geojson";
    pub const MIN_DISTANCE: &str = "min_distance";
    pub const MAX_DISTANCE: &str = "max_distance";

    /// Keys that shape the param itself and can never name a handler.
    pub const STRUCTURAL: [&str; 9] =
        [TYPE, PATHS, BIND_TO, MULTIPLE, SEPARATOR, OPERATOR, PARSE, SET, GET];

    /// Fields of a serialized validation error; a handler under one of these names would
    /// have its option echo collide with them.
    pub const ERROR_FIELDS: [&str; 5] = ["valid", "name", "param", "value", "message"];
}

pub type DefaultFn = Arc<dyn Fn(&Param) -> Value + Send + Sync>;
/// `(value, path, operator, param, schema) -> fragment`
pub type ParseFn =
    Arc<dyn Fn(&Value, &str, &str, &Param, Option<&Schema>) -> Document + Send + Sync>;
pub type HookFn = Arc<dyn Fn(Value, &Param) -> Value + Send + Sync>;

/// Value of one param option.
#[derive(Clone)]
pub enum OptionValue {
    Value(Value),
    Type(ValueType),
    /// A one-element type list: the param holds a sequence of this type.
    TypeList(ValueType),
    /// A default computed from the param.
    Default(DefaultFn),
    /// A param-level parser.
    Parse(ParseFn),
    /// The `set` and `get` hooks.
    Hook(HookFn),
}

impl OptionValue {
    pub fn parse<F>(f: F) -> Self
    where
        F: Fn(&Value, &str, &str, &Param, Option<&Schema>) -> Document + Send + Sync + 'static,
    {
        Self::Parse(Arc::new(f))
    }

    pub fn default_fn<F>(f: F) -> Self
    where
        F: Fn(&Param) -> Value + Send + Sync + 'static,
    {
        Self::Default(Arc::new(f))
    }

    pub fn hook<F>(f: F) -> Self
    where
        F: Fn(Value, &Param) -> Value + Send + Sync + 'static,
    {
        Self::Hook(Arc::new(f))
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    /// Only plain numbers count; numeric strings do not.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Value(Value::Number(n)) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Value(v) => v.is_truthy(),
            _ => true,
        }
    }

    /// The option as reported back in a validation error.
    #[must_use]
    pub fn echo(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Type(t) => Value::String(t.name().to_string()),
            Self::TypeList(t) => Value::Array(vec![Value::String(t.name().to_string())]),
            Self::Default(_) | Self::Parse(_) | Self::Hook(_) => Value::Null,
        }
    }
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:?}"),
            Self::Type(t) => write!(f, "Type({t:?})"),
            Self::TypeList(t) => write!(f, "TypeList({t:?})"),
            Self::Default(_) => f.write_str("Default(fn)"),
            Self::Parse(_) => f.write_str("Parse(fn)"),
            Self::Hook(_) => f.write_str("Hook(fn)"),
        }
    }
}

impl From<Value> for OptionValue {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<ValueType> for OptionValue {
    fn from(t: ValueType) -> Self {
        Self::Type(t)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        Self::Value(s.into())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        Self::Value(s.into())
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        Self::Value(b.into())
    }
}

impl From<f64> for OptionValue {
    fn from(n: f64) -> Self {
        Self::Value(n.into())
    }
}

impl From<i32> for OptionValue {
    fn from(n: i32) -> Self {
        Self::Value(n.into())
    }
}

impl From<i64> for OptionValue {
    fn from(n: i64) -> Self {
        Self::Value(n.into())
    }
}

impl From<Pattern> for OptionValue {
    fn from(p: Pattern) -> Self {
        Self::Value(p.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for OptionValue {
    fn from(items: Vec<T>) -> Self {
        Self::Value(items.into())
    }
}

/// Insertion-ordered option map.
///
/// Assigning an existing key replaces its value where it stands; new keys are appended.
/// Handlers run in this order, so the order is part of a param's behavior.
#[derive(Clone, Default)]
pub struct ParamOptions {
    entries: Vec<(String, OptionValue)>,
}

impl ParamOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<OptionValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets `name`, returning the previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<OptionValue>) -> Option<OptionValue> {
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| k == name) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((name.to_string(), value));
        None
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<OptionValue> {
        let idx = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(idx).1)
    }

    /// Assigns every entry of `other` over this map, in `other`'s order.
    pub fn merge(&mut self, other: Self) {
        for (k, v) in other.entries {
            self.insert(&k, v);
        }
    }

    #[must_use]
    pub fn merged(mut self, other: Self) -> Self {
        self.merge(other);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ParamOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().map(|(k, v)| (k, v))).finish()
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for ParamOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (k, v) in iter {
            let k: String = k.into();
            out.insert(&k, v);
        }
        out
    }
}
