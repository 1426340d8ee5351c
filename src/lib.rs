//! Query-string to query-document conversion.
//!
//! A [`Schema`] of [`Param`]s binds raw request parameters, validates them and parses them
//! into bucketed BSON fragments: filter criteria, a field projection and cursor options.
//!
//! ```no_run
//! use querymen::{RawQuery, Schema};
//!
//! let mut schema = Schema::default();
//! let parsed = schema.parse(&RawQuery::parse("q=hello&page=2&sort=-rating"));
//! println!("{}", parsed.to_json());
//! ```

pub mod config;
pub mod errors;
pub mod handlers;
pub mod logger;
pub mod middleware;
pub mod param;
pub mod schema;
pub mod value;

pub use errors::QueryError;
pub use handlers::{Handler, HandlerKind, HandlerName, HandlerRegistry};
pub use middleware::Middleware;
pub use param::{OptionValue, Param, ParamOptions, Validation, ValidationError, keys};
pub use schema::{Instantiate, ParamDef, ParsedQuery, RawQuery, Schema, SchemaOptions, Toggle};
pub use value::{Pattern, Value, ValueType};

/// Initializes logging from `log4rs.yaml`.
///
/// # Errors
/// Returns an error when the logging configuration cannot be loaded.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::init()
}
