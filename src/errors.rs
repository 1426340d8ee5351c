use thiserror::Error;

/// Failures of the configuration surface: registering handlers and loading schemas.
///
/// Parameter validation failures are not errors of this kind; they are reported as
/// [`crate::ValidationError`] values.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid handler name: {0}")]
    InvalidHandlerName(String),

    #[error("Unknown handler kind: {0}")]
    UnknownHandlerKind(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for QueryError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
