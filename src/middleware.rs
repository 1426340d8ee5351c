//! Request adapter: one fresh schema per request, validated and then parsed.

use crate::handlers::global;
use crate::param::ValidationError;
use crate::schema::{Instantiate, ParsedQuery, RawQuery, Schema};

#[derive(Debug, Clone)]
pub struct Middleware {
    prototype: Schema,
    mode: Instantiate,
}

impl Default for Middleware {
    fn default() -> Self {
        Self::new(Schema::default())
    }
}

impl Middleware {
    #[must_use]
    pub fn new(prototype: Schema) -> Self {
        Self { prototype, mode: Instantiate::default() }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: Instantiate) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn prototype(&self) -> &Schema {
        &self.prototype
    }

    #[must_use]
    pub fn mode(&self) -> Instantiate {
        self.mode
    }

    fn request_schema(&self) -> Schema {
        let mut schema = self.prototype.instantiate(self.mode);
        schema.extend_handlers(&global::snapshot());
        schema
    }

    /// Validates and parses one request's parameters.
    ///
    /// # Errors
    /// Returns the first `ValidationError` of the request.
    pub fn handle(&self, raw: &RawQuery) -> Result<ParsedQuery, ValidationError> {
        let mut schema = self.request_schema();
        schema.validate(raw)?;
        Ok(schema.parse(raw))
    }

    /// Validates one request's parameters without parsing them.
    ///
    /// # Errors
    /// Returns the first `ValidationError` of the request.
    pub fn validate(&self, raw: &RawQuery) -> Result<(), ValidationError> {
        self.request_schema().validate(raw)
    }

    /// [`Middleware::handle`] for an URL-encoded query string.
    ///
    /// # Errors
    /// Returns the first `ValidationError` of the request.
    pub fn handle_query_string(&self, qs: &str) -> Result<ParsedQuery, ValidationError> {
        self.handle(&RawQuery::parse(qs))
    }
}
