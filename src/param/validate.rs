use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

use crate::value::Value;

/// Result of one validator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub message: String,
}

impl Validation {
    #[must_use]
    pub fn check(valid: bool, message: impl Into<String>) -> Self {
        Self { valid, message: message.into() }
    }

    #[must_use]
    pub fn ok() -> Self {
        Self { valid: true, message: String::new() }
    }
}

/// First constraint a param failed.
///
/// Serializes as `{valid, name, param, value, <name>: option, message}` so that the
/// failing option's configured value is echoed under its own name.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Name of the failing option (`required`, `min`, ...).
    pub name: String,
    /// Name of the param.
    pub param: String,
    /// The value that was rejected.
    pub value: Value,
    /// The failing option's configured value.
    pub option: Value,
    pub message: String,
}

impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(6))?;
        map.serialize_entry("valid", &false)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("param", &self.param)?;
        map.serialize_entry("value", &self.value)?;
        map.serialize_entry(&self.name, &self.option)?;
        map.serialize_entry("message", &self.message)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_option_under_its_name() {
        let e = ValidationError {
            name: "max".into(),
            param: "limit".into(),
            value: Value::from(500),
            option: Value::from(100),
            message: "limit must be lower than or equal to 100".into(),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["max"], 100);
        assert_eq!(json["value"], 500);
        assert_eq!(json["param"], "limit");
        assert_eq!(json["valid"], false);
        assert_eq!(e.to_string(), "limit must be lower than or equal to 100");
    }
}
