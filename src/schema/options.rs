use chrono::{DateTime, Utc};

use crate::param::{OptionValue, ParamOptions, keys};
use crate::value::{Pattern, Value, ValueType};

/// Per-parameter schema switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    /// `false` disables the parameter.
    Enabled(bool),
    /// External name the parameter is read from.
    Alias(String),
}

impl From<bool> for Toggle {
    fn from(b: bool) -> Self {
        Self::Enabled(b)
    }
}

impl From<&str> for Toggle {
    fn from(s: &str) -> Self {
        Self::Alias(s.to_string())
    }
}

impl From<String> for Toggle {
    fn from(s: String) -> Self {
        Self::Alias(s)
    }
}

/// Schema-level switches, aliases and the default bucket.
///
/// `near` starts disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaOptions {
    entries: Vec<(String, Toggle)>,
    default_bucket: String,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            entries: vec![(super::defaults::NEAR.to_string(), Toggle::Enabled(false))],
            default_bucket: crate::param::DEFAULT_BUCKET.to_string(),
        }
    }
}

impl SchemaOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: &str, toggle: impl Into<Toggle>) -> Self {
        self.set(name, toggle);
        self
    }

    #[must_use]
    pub fn with_default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.default_bucket = bucket.into();
        self
    }

    pub fn set(&mut self, name: &str, toggle: impl Into<Toggle>) {
        let toggle = toggle.into();
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = toggle,
            None => self.entries.push((name.to_string(), toggle)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Toggle> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, t)| t)
    }

    /// Everything is enabled unless switched off explicitly; an alias counts as enabled.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        !matches!(self.get(name), Some(Toggle::Enabled(false)))
    }

    #[must_use]
    pub fn alias(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Toggle::Alias(alias)) => Some(alias),
            _ => None,
        }
    }

    /// Internal name whose alias is `external`.
    #[must_use]
    pub fn aliased_by(&self, external: &str) -> Option<&str> {
        self.entries.iter().find_map(|(k, t)| match t {
            Toggle::Alias(alias) if alias == external => Some(k.as_str()),
            _ => None,
        })
    }

    #[must_use]
    pub fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    pub fn set_default_bucket(&mut self, bucket: impl Into<String>) {
        self.default_bucket = bucket.into();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Toggle)> {
        self.entries.iter().map(|(k, t)| (k.as_str(), t))
    }
}

/// Shorthand parameter definition.
///
/// A default value implies its type (strings excepted), a bare type sets only the type,
/// and a list, or a sequence default, makes the parameter multi-valued.
#[derive(Debug, Clone)]
pub enum ParamDef {
    Options(ParamOptions),
    Default(Value),
    Type(ValueType),
    List(Box<ParamDef>),
}

impl ParamDef {
    #[must_use]
    pub fn list(inner: impl Into<ParamDef>) -> Self {
        Self::List(Box::new(inner.into()))
    }

    /// Expands the shorthand into full options.
    #[must_use]
    pub fn into_options(self) -> ParamOptions {
        match self {
            Self::Options(options) => options,
            Self::Type(ty) => ParamOptions::new().with(keys::TYPE, ty),
            Self::Default(Value::Array(items)) => {
                let ty = items.first().map_or(ValueType::String, ValueType::infer);
                ParamOptions::new()
                    .with(keys::TYPE, OptionValue::TypeList(ty))
                    .with(keys::DEFAULT, Value::Array(items))
            }
            Self::Default(value) => {
                let typed = match &value {
                    Value::Number(_) => Some(ValueType::Number),
                    Value::Boolean(_) => Some(ValueType::Boolean),
                    Value::Date(_) | Value::InvalidDate => Some(ValueType::Date),
                    Value::Regex(_) => Some(ValueType::Regex),
                    _ => None,
                };
                let options = ParamOptions::new();
                let options = match typed {
                    Some(ty) => options.with(keys::TYPE, ty),
                    None => options,
                };
                options.with(keys::DEFAULT, value)
            }
            Self::List(inner) => {
                let inner = inner.into_options();
                let ty = match inner.get(keys::TYPE) {
                    Some(OptionValue::Type(ty) | OptionValue::TypeList(ty)) => ty.clone(),
                    _ => ValueType::String,
                };
                let mut options = ParamOptions::new().with(keys::TYPE, OptionValue::TypeList(ty));
                if let Some(default) = inner.get(keys::DEFAULT).filter(|d| d.is_truthy()) {
                    options.insert(keys::DEFAULT, default.clone());
                }
                options
            }
        }
    }
}

impl From<ParamOptions> for ParamDef {
    fn from(o: ParamOptions) -> Self {
        Self::Options(o)
    }
}

impl From<ValueType> for ParamDef {
    fn from(t: ValueType) -> Self {
        Self::Type(t)
    }
}

impl From<Value> for ParamDef {
    fn from(v: Value) -> Self {
        Self::Default(v)
    }
}

impl From<&str> for ParamDef {
    fn from(s: &str) -> Self {
        Self::Default(s.into())
    }
}

impl From<String> for ParamDef {
    fn from(s: String) -> Self {
        Self::Default(s.into())
    }
}

impl From<f64> for ParamDef {
    fn from(n: f64) -> Self {
        Self::Default(n.into())
    }
}

impl From<i32> for ParamDef {
    fn from(n: i32) -> Self {
        Self::Default(n.into())
    }
}

impl From<bool> for ParamDef {
    fn from(b: bool) -> Self {
        Self::Default(b.into())
    }
}

impl From<DateTime<Utc>> for ParamDef {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Default(d.into())
    }
}

impl From<Pattern> for ParamDef {
    fn from(p: Pattern) -> Self {
        Self::Default(p.into())
    }
}
