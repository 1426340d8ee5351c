//! Process-wide handler registry.
//!
//! Schemas copy a snapshot of this registry when they are built and the middleware
//! overlays it on every request schema. Tests can call [`reset`] between runs.

use bson::Document;
use parking_lot::RwLock;
use std::sync::LazyLock;

use super::{FormatterFn, Handler, HandlerKind, HandlerName, HandlerRegistry, ParserFn, ValidatorFn};
use crate::errors::QueryError;
use crate::param::{OptionValue, Param, Validation};
use crate::schema::Schema;
use crate::value::Value;

static REGISTRY: LazyLock<RwLock<HandlerRegistry>> =
    LazyLock::new(|| RwLock::new(HandlerRegistry::new()));

/// Returns the handler of `kind` registered under `name`, if any.
pub fn handler(kind: HandlerKind, name: &str) -> Option<Handler> {
    REGISTRY.read().get(kind, name)
}

/// Registers a handler for the whole process.
///
/// # Errors
/// Returns `QueryError::InvalidHandlerName` when `name` is not a valid handler identifier.
pub fn set_handler(name: &str, handler: Handler) -> Result<(), QueryError> {
    let name = HandlerName::new(name)?;
    log::debug!("registered global {} handler {name}", handler.kind());
    REGISTRY.write().insert(name, handler);
    Ok(())
}

/// Registers a handler whose kind is given as text (e.g. from configuration).
///
/// # Errors
/// Returns `QueryError::UnknownHandlerKind` for anything but parser/formatter/validator,
/// or when the kind does not match the handler, and `InvalidHandlerName` for a bad name.
pub fn set_handler_by_kind(kind: &str, name: &str, handler: Handler) -> Result<(), QueryError> {
    let kind: HandlerKind = kind.parse()?;
    if kind != handler.kind() {
        return Err(QueryError::UnknownHandlerKind(format!(
            "{kind} (handler is a {})",
            handler.kind()
        )));
    }
    set_handler(name, handler)
}

pub fn parser(name: &str) -> Option<ParserFn> {
    REGISTRY.read().parser(name).cloned()
}

pub fn formatter(name: &str) -> Option<FormatterFn> {
    REGISTRY.read().formatter(name).cloned()
}

pub fn validator(name: &str) -> Option<ValidatorFn> {
    REGISTRY.read().validator(name).cloned()
}

/// # Errors
/// Returns `QueryError::InvalidHandlerName` for an invalid name.
pub fn register_parser<F>(name: &str, f: F) -> Result<(), QueryError>
where
    F: Fn(&OptionValue, &Value, &str, &str, &Param, Option<&Schema>) -> Document
        + Send
        + Sync
        + 'static,
{
    set_handler(name, Handler::parser(f))
}

/// # Errors
/// Returns `QueryError::InvalidHandlerName` for an invalid name.
pub fn register_formatter<F>(name: &str, f: F) -> Result<(), QueryError>
where
    F: Fn(&OptionValue, Value, &Param) -> Value + Send + Sync + 'static,
{
    set_handler(name, Handler::formatter(f))
}

/// # Errors
/// Returns `QueryError::InvalidHandlerName` for an invalid name.
pub fn register_validator<F>(name: &str, f: F) -> Result<(), QueryError>
where
    F: Fn(&OptionValue, &Value, &Param, Option<&Schema>) -> Validation + Send + Sync + 'static,
{
    set_handler(name, Handler::validator(f))
}

/// Removes a handler, returning it when it existed.
pub fn remove(kind: HandlerKind, name: &str) -> Option<Handler> {
    REGISTRY.write().remove(kind, name)
}

/// Copy of the current registry.
pub fn snapshot() -> HandlerRegistry {
    REGISTRY.read().clone()
}

/// Drops every process-wide handler.
pub fn reset() {
    *REGISTRY.write() = HandlerRegistry::new();
}
