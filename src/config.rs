//! Schemas declared in TOML.
//!
//! ```toml
//! [options]
//! default_bucket = "query"
//! near = true          # enable or disable a parameter
//! q = "search"         # read `q` from `?search=`
//!
//! [params]
//! category = "books"   # shorthand default
//!
//! [params.tags]
//! type = ["string"]
//! lowercase = true
//! ```
//!
//! Option order within a table is the file order.

use std::path::Path;

use crate::errors::QueryError;
use crate::param::{OptionValue, ParamOptions, keys};
use crate::schema::{ParamDef, Schema, SchemaOptions, Toggle};
use crate::value::{Pattern, Value, ValueType, parse_date};

const DEFAULT_BUCKET_KEY: &str = "default_bucket";

/// Parsed schema file.
#[derive(Debug, Clone, Default)]
pub struct SchemaConfig {
    pub options: SchemaOptions,
    pub params: Vec<(String, ParamDef)>,
}

impl SchemaConfig {
    /// # Errors
    /// Returns `QueryError::Toml` for malformed TOML and `QueryError::Config` for
    /// values that do not describe a schema.
    pub fn from_toml_str(s: &str) -> Result<Self, QueryError> {
        let root: toml::Table = toml::from_str(s)?;
        let mut config = Self::default();
        if let Some(options) = root.get("options") {
            config.options = schema_options(options)?;
        }
        if let Some(params) = root.get("params") {
            let toml::Value::Table(params) = params else {
                return Err(QueryError::Config("[params] must be a table".into()));
            };
            for (name, def) in params {
                config.params.push((name.clone(), param_def(name, def)?));
            }
        }
        Ok(config)
    }

    /// # Errors
    /// Returns `QueryError::Io` when the file cannot be read, otherwise as
    /// [`SchemaConfig::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, QueryError> {
        let text = std::fs::read_to_string(path)?;
        log::debug!("loading schema from {}", path.display());
        Self::from_toml_str(&text)
    }

    #[must_use]
    pub fn into_schema(self) -> Schema {
        Schema::new(self.params, self.options)
    }
}

/// Loads a schema file and builds the schema.
///
/// # Errors
/// See [`SchemaConfig::load`].
pub fn load_schema(path: &Path) -> Result<Schema, QueryError> {
    Ok(SchemaConfig::load(path)?.into_schema())
}

fn schema_options(value: &toml::Value) -> Result<SchemaOptions, QueryError> {
    let toml::Value::Table(table) = value else {
        return Err(QueryError::Config("[options] must be a table".into()));
    };
    let mut options = SchemaOptions::default();
    for (name, value) in table {
        match (name.as_str(), value) {
            (DEFAULT_BUCKET_KEY, toml::Value::String(bucket)) => options.set_default_bucket(bucket.as_str()),
            (DEFAULT_BUCKET_KEY, _) => {
                return Err(QueryError::Config("default_bucket must be a string".into()));
            }
            (_, toml::Value::Boolean(on)) => options.set(name, Toggle::Enabled(*on)),
            (_, toml::Value::String(alias)) => options.set(name, Toggle::Alias(alias.clone())),
            _ => {
                return Err(QueryError::Config(format!(
                    "option {name} must be a boolean or an alias"
                )));
            }
        }
    }
    Ok(options)
}

fn param_def(name: &str, value: &toml::Value) -> Result<ParamDef, QueryError> {
    let toml::Value::Table(table) = value else {
        return Ok(ParamDef::Default(scalar(value)?));
    };
    let mut options = ParamOptions::new();
    for (key, value) in table {
        let option = match key.as_str() {
            keys::TYPE => OptionValue::from(type_option(name, value)?),
            keys::MATCH => {
                let toml::Value::String(source) = value else {
                    return Err(QueryError::Config(format!("{name}.match must be a string")));
                };
                let pattern = Pattern::new(source, false)
                    .map_err(|e| QueryError::Config(format!("{name}.match: {e}")))?;
                OptionValue::from(pattern)
            }
            _ => OptionValue::from(scalar(value)?),
        };
        options.insert(key, option);
    }
    Ok(ParamDef::Options(options))
}

fn type_option(name: &str, value: &toml::Value) -> Result<OptionValue, QueryError> {
    let lookup = |ty: &str| {
        ValueType::from_name(ty)
            .ok_or_else(|| QueryError::Config(format!("{name}: unknown type {ty}")))
    };
    match value {
        toml::Value::String(ty) => Ok(OptionValue::Type(lookup(ty)?)),
        toml::Value::Array(items) => match items.as_slice() {
            [toml::Value::String(ty)] => Ok(OptionValue::TypeList(lookup(ty)?)),
            _ => Err(QueryError::Config(format!("{name}: type list must hold one type name"))),
        },
        _ => Err(QueryError::Config(format!("{name}: type must be a name or a list"))),
    }
}

fn scalar(value: &toml::Value) -> Result<Value, QueryError> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s.clone()),
        #[allow(clippy::cast_precision_loss)]
        toml::Value::Integer(n) => Value::Number(*n as f64),
        toml::Value::Float(n) => Value::Number(*n),
        toml::Value::Boolean(b) => Value::Boolean(*b),
        toml::Value::Datetime(dt) => parse_date(&dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(scalar).collect::<Result<_, _>>()?),
        toml::Value::Table(_) => {
            return Err(QueryError::Config("nested tables are not option values".into()));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_and_lists() {
        let cfg = SchemaConfig::from_toml_str(
            r#"
            [params.tags]
            type = ["string"]
            [params.age]
            type = "number"
            min = 18
            "#,
        )
        .unwrap();
        let opts = cfg.params[0].1.clone().into_options();
        assert!(matches!(opts.get(keys::TYPE), Some(OptionValue::TypeList(ValueType::String))));
        let opts = cfg.params[1].1.clone().into_options();
        assert_eq!(opts.keys().collect::<Vec<_>>(), ["type", "min"]);
    }

    #[test]
    fn unknown_type_is_config_error() {
        let err = SchemaConfig::from_toml_str("[params.x]\ntype = \"uuid\"").unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
    }

    #[test]
    fn malformed_toml_is_toml_error() {
        assert!(matches!(SchemaConfig::from_toml_str("[params"), Err(QueryError::Toml(_))));
    }
}
