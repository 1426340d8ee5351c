//! Named parser, formatter and validator handlers.
//!
//! A handler is looked up by option name: when a param carries an option whose name
//! matches a registered handler of the right kind, the handler runs with that option's
//! value. Registries are keyed by a closed [`HandlerKind`] and a validated
//! [`HandlerName`], so externally supplied strings can never address anything else.

pub mod global;

use bson::Document;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::QueryError;
use crate::param::{OptionValue, Param, Validation, keys};
use crate::schema::Schema;
use crate::value::Value;

/// `(option value, value, path, operator, param, schema) -> fragment`
pub type ParserFn =
    Arc<dyn Fn(&OptionValue, &Value, &str, &str, &Param, Option<&Schema>) -> Document + Send + Sync>;
/// `(option value, current value, param) -> new value`
pub type FormatterFn = Arc<dyn Fn(&OptionValue, Value, &Param) -> Value + Send + Sync>;
/// `(option value, value, param, schema) -> validation`
pub type ValidatorFn =
    Arc<dyn Fn(&OptionValue, &Value, &Param, Option<&Schema>) -> Validation + Send + Sync>;

const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandlerKind {
    Parser,
    Formatter,
    Validator,
}

impl HandlerKind {
    pub const ALL: [Self; 3] = [Self::Parser, Self::Formatter, Self::Validator];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parser => "parser",
            Self::Formatter => "formatter",
            Self::Validator => "validator",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parser" | "parsers" => Ok(Self::Parser),
            "formatter" | "formatters" => Ok(Self::Formatter),
            "validator" | "validators" => Ok(Self::Validator),
            other => Err(QueryError::UnknownHandlerKind(other.to_string())),
        }
    }
}

/// Identifier a handler is registered under; equal to the option name that triggers it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerName(String);

impl HandlerName {
    /// # Errors
    /// Returns `QueryError::InvalidHandlerName` unless `name` is 1-64 ASCII alphanumerics,
    /// `_` or `-`, starts with a letter or `_`, and is neither a structural option key nor
    /// a field of a serialized validation error.
    pub fn new(name: &str) -> Result<Self, QueryError> {
        let invalid = || QueryError::InvalidHandlerName(name.to_string());
        let mut chars = name.chars();
        let first = chars.next().ok_or_else(invalid)?;
        if !(first.is_ascii_alphabetic() || first == '_') {
            return Err(invalid());
        }
        if name.len() > MAX_NAME_LEN
            || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid());
        }
        if keys::STRUCTURAL.contains(&name) || keys::ERROR_FIELDS.contains(&name) {
            return Err(invalid());
        }
        Ok(Self(name.to_string()))
    }

    // Built-in names are known to be valid.
    pub(crate) fn builtin(name: &'static str) -> Self {
        Self(name.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for HandlerName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for HandlerName {
    type Error = QueryError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

/// A handler function tagged with its kind.
#[derive(Clone)]
pub enum Handler {
    Parser(ParserFn),
    Formatter(FormatterFn),
    Validator(ValidatorFn),
}

impl Handler {
    pub fn parser<F>(f: F) -> Self
    where
        F: Fn(&OptionValue, &Value, &str, &str, &Param, Option<&Schema>) -> Document
            + Send
            + Sync
            + 'static,
    {
        Self::Parser(Arc::new(f))
    }

    pub fn formatter<F>(f: F) -> Self
    where
        F: Fn(&OptionValue, Value, &Param) -> Value + Send + Sync + 'static,
    {
        Self::Formatter(Arc::new(f))
    }

    pub fn validator<F>(f: F) -> Self
    where
        F: Fn(&OptionValue, &Value, &Param, Option<&Schema>) -> Validation + Send + Sync + 'static,
    {
        Self::Validator(Arc::new(f))
    }

    #[must_use]
    pub fn kind(&self) -> HandlerKind {
        match self {
            Self::Parser(_) => HandlerKind::Parser,
            Self::Formatter(_) => HandlerKind::Formatter,
            Self::Validator(_) => HandlerKind::Validator,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler::{}", self.kind())
    }
}

/// Three maps of named handlers, one per kind.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    parsers: BTreeMap<HandlerName, ParserFn>,
    formatters: BTreeMap<HandlerName, FormatterFn>,
    validators: BTreeMap<HandlerName, ValidatorFn>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, returning the handler it replaced.
    pub fn insert(&mut self, name: HandlerName, handler: Handler) -> Option<Handler> {
        match handler {
            Handler::Parser(f) => self.parsers.insert(name, f).map(Handler::Parser),
            Handler::Formatter(f) => self.formatters.insert(name, f).map(Handler::Formatter),
            Handler::Validator(f) => self.validators.insert(name, f).map(Handler::Validator),
        }
    }

    #[must_use]
    pub fn get(&self, kind: HandlerKind, name: &str) -> Option<Handler> {
        match kind {
            HandlerKind::Parser => self.parsers.get(name).cloned().map(Handler::Parser),
            HandlerKind::Formatter => self.formatters.get(name).cloned().map(Handler::Formatter),
            HandlerKind::Validator => self.validators.get(name).cloned().map(Handler::Validator),
        }
    }

    pub fn remove(&mut self, kind: HandlerKind, name: &str) -> Option<Handler> {
        match kind {
            HandlerKind::Parser => self.parsers.remove(name).map(Handler::Parser),
            HandlerKind::Formatter => self.formatters.remove(name).map(Handler::Formatter),
            HandlerKind::Validator => self.validators.remove(name).map(Handler::Validator),
        }
    }

    #[must_use]
    pub fn parser(&self, name: &str) -> Option<&ParserFn> {
        self.parsers.get(name)
    }

    #[must_use]
    pub fn formatter(&self, name: &str) -> Option<&FormatterFn> {
        self.formatters.get(name)
    }

    #[must_use]
    pub fn validator(&self, name: &str) -> Option<&ValidatorFn> {
        self.validators.get(name)
    }

    /// Every `(name, handler)` pair, parsers first.
    pub fn iter(&self) -> impl Iterator<Item = (&HandlerName, Handler)> + '_ {
        let parsers = self.parsers.iter().map(|(n, f)| (n, Handler::Parser(f.clone())));
        let formatters = self.formatters.iter().map(|(n, f)| (n, Handler::Formatter(f.clone())));
        let validators = self.validators.iter().map(|(n, f)| (n, Handler::Validator(f.clone())));
        parsers.chain(formatters).chain(validators)
    }

    /// Copies every handler of `other` over this registry.
    pub fn extend_from(&mut self, other: &Self) {
        for (name, handler) in other.iter() {
            self.insert(name.clone(), handler);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parsers.len() + self.formatters.len() + self.validators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("parsers", &self.parsers.keys().collect::<Vec<_>>())
            .field("formatters", &self.formatters.keys().collect::<Vec<_>>())
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}
