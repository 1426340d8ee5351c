//! A single named query parameter.
//!
//! A param binds one raw value through its formatter pipeline and type cast, checks it
//! against its validators and turns it into a query fragment through its parsers.
//! Handlers are looked up by option name and run in option order.

mod builtins;
mod options;
mod validate;

pub use options::{DefaultFn, HookFn, OptionValue, ParamOptions, ParseFn, keys};
pub use validate::{Validation, ValidationError};

use bson::{Bson, Document};

use crate::errors::QueryError;
use crate::handlers::{
    FormatterFn, Handler, HandlerKind, HandlerName, HandlerRegistry, ParserFn, ValidatorFn,
};
use crate::schema::Schema;
use crate::value::{Value, ValueType, cast};

/// Bucket a param contributes to unless configured otherwise.
pub const DEFAULT_BUCKET: &str = "query";

#[derive(Clone, Debug)]
pub struct Param {
    name: String,
    value: Value,
    initial: Value,
    options: ParamOptions,
    handlers: HandlerRegistry,
}

impl Param {
    /// Creates a param and binds `value`.
    ///
    /// `options` are assigned over the defaults (`paths: [name]`, `bindTo: "query"`,
    /// `multiple: false`, `separator: ","`, `operator: "$eq"`, `trim: true`). Without a
    /// `type` option the type is inferred from `value`; a sequence value or a
    /// [`OptionValue::TypeList`] type makes the param multi-valued.
    pub fn new(name: impl Into<String>, value: impl Into<Value>, options: ParamOptions) -> Self {
        let name = name.into();
        let value = value.into();
        let mut merged = ParamOptions::new()
            .with(keys::PATHS, vec![name.clone()])
            .with(keys::BIND_TO, DEFAULT_BUCKET)
            .with(keys::MULTIPLE, false)
            .with(keys::SEPARATOR, ",")
            .with(keys::OPERATOR, "$eq")
            .with(keys::TRIM, true);
        merged.merge(options);

        match merged.get(keys::TYPE) {
            Some(OptionValue::TypeList(ty)) => {
                let ty = ty.clone();
                merged.insert(keys::TYPE, ty);
                merged.insert(keys::MULTIPLE, true);
            }
            Some(_) => {}
            None => {
                if matches!(value, Value::Array(_)) {
                    merged.insert(keys::MULTIPLE, true);
                }
                merged.insert(keys::TYPE, ValueType::infer(&value));
            }
        }

        let mut param = Self {
            name,
            value: Value::Null,
            initial: value.clone(),
            options: merged,
            handlers: builtins::registry(),
        };
        param.set_value(value);
        param
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Shorthand for a param with no initial value.
    pub fn named(name: impl Into<String>, options: ParamOptions) -> Self {
        Self::new(name, Value::Null, options)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn options(&self) -> &ParamOptions {
        &self.options
    }

    #[must_use]
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    /// Sets one option. Nothing is checked here; bad combinations show up when the
    /// param is next formatted, parsed or validated.
    pub fn set_option(&mut self, name: &str, value: impl Into<OptionValue>) -> &mut Self {
        self.options.insert(name, value);
        self
    }

    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self.option(keys::TYPE) {
            Some(OptionValue::Type(ty) | OptionValue::TypeList(ty)) => ty.clone(),
            _ => ValueType::String,
        }
    }

    #[must_use]
    pub fn is_multiple(&self) -> bool {
        self.option(keys::MULTIPLE).is_some_and(OptionValue::is_truthy)
            || matches!(self.option(keys::TYPE), Some(OptionValue::TypeList(_)))
    }

    #[must_use]
    pub fn separator(&self) -> &str {
        self.option(keys::SEPARATOR).and_then(OptionValue::as_str).unwrap_or(",")
    }

    #[must_use]
    pub fn operator(&self) -> &str {
        self.option(keys::OPERATOR).and_then(OptionValue::as_str).unwrap_or("$eq")
    }

    /// Destination bucket of this param's fragment.
    #[must_use]
    pub fn bind_to(&self) -> &str {
        self.option(keys::BIND_TO).and_then(OptionValue::as_str).unwrap_or(DEFAULT_BUCKET)
    }

    /// Destination field names; a single string is one path.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        match self.option(keys::PATHS).and_then(OptionValue::as_value) {
            Some(Value::Array(items)) => items.iter().map(Value::to_text).collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => vec![self.name.clone()],
        }
    }

    // --- handlers ---

    #[must_use]
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    #[must_use]
    pub fn handler(&self, kind: HandlerKind, name: &str) -> Option<Handler> {
        self.handlers.get(kind, name)
    }

    /// Registers a handler on this param only.
    pub fn set_handler(&mut self, name: HandlerName, handler: Handler) -> &mut Self {
        self.handlers.insert(name, handler);
        self
    }

    /// Copies every handler of `registry` into this param.
    pub fn extend_handlers(&mut self, registry: &HandlerRegistry) -> &mut Self {
        self.handlers.extend_from(registry);
        self
    }

    #[must_use]
    pub fn parser(&self, name: &str) -> Option<&ParserFn> {
        self.handlers.parser(name)
    }

    #[must_use]
    pub fn formatter(&self, name: &str) -> Option<&FormatterFn> {
        self.handlers.formatter(name)
    }

    #[must_use]
    pub fn validator(&self, name: &str) -> Option<&ValidatorFn> {
        self.handlers.validator(name)
    }

    /// # Errors
    /// Returns `QueryError::InvalidHandlerName` for an invalid name.
    pub fn set_parser<F>(&mut self, name: &str, f: F) -> Result<&mut Self, QueryError>
    where
        F: Fn(&OptionValue, &Value, &str, &str, &Param, Option<&Schema>) -> Document
            + Send
            + Sync
            + 'static,
    {
        Ok(self.set_handler(HandlerName::new(name)?, Handler::parser(f)))
    }

    /// # Errors
    /// Returns `QueryError::InvalidHandlerName` for an invalid name.
    pub fn set_formatter<F>(&mut self, name: &str, f: F) -> Result<&mut Self, QueryError>
    where
        F: Fn(&OptionValue, Value, &Param) -> Value + Send + Sync + 'static,
    {
        Ok(self.set_handler(HandlerName::new(name)?, Handler::formatter(f)))
    }

    /// # Errors
    /// Returns `QueryError::InvalidHandlerName` for an invalid name.
    pub fn set_validator<F>(&mut self, name: &str, f: F) -> Result<&mut Self, QueryError>
    where
        F: Fn(&OptionValue, &Value, &Param, Option<&Schema>) -> Validation + Send + Sync + 'static,
    {
        Ok(self.set_handler(HandlerName::new(name)?, Handler::validator(f)))
    }

    // --- value ---

    /// The bound value as seen through the `get` hook.
    #[must_use]
    pub fn value(&self) -> Value {
        let Some(OptionValue::Hook(get)) = self.option(keys::GET) else {
            return self.value.clone();
        };
        match &self.value {
            Value::Array(items) => Value::Array(items.iter().map(|v| get(v.clone(), self)).collect()),
            other => get(other.clone(), self),
        }
    }

    /// The bound value exactly as stored.
    #[must_use]
    pub fn bound(&self) -> &Value {
        &self.value
    }

    /// Formats `raw` and binds the result.
    pub fn set_value(&mut self, raw: impl Into<Value>) -> Value {
        let value = self.format(raw);
        self.value = value.clone();
        value
    }

    /// Rebinds the value this param was created with.
    pub fn reset(&mut self) -> Value {
        self.set_value(self.initial.clone())
    }

    /// Runs `raw` through the pipeline without binding it.
    ///
    /// Multi-value params split strings on the separator first and format every element
    /// on its own, so the result is always a sequence once non-nil.
    #[must_use]
    pub fn format(&self, raw: impl Into<Value>) -> Value {
        let raw = raw.into();
        if !self.is_multiple() {
            return self.format_one(raw);
        }
        if raw.is_nil() {
            // The chain has already run once on nil; elements are only typed.
            let formatted = self.run_formatters(Value::Null);
            if formatted.is_nil() {
                return self.apply_set(formatted);
            }
            let items = self.split(formatted);
            return Value::Array(items.into_iter().map(|v| self.cast_one(v)).collect());
        }
        Value::Array(self.split(raw).into_iter().map(|v| self.format_one(v)).collect())
    }

    fn split(&self, value: Value) -> Vec<Value> {
        match value {
            Value::Array(items) => items,
            Value::String(s) => {
                let sep = self.separator();
                if sep.is_empty() {
                    vec![Value::String(s)]
                } else {
                    s.split(sep).map(Value::from).collect()
                }
            }
            other => vec![other],
        }
    }

    fn format_one(&self, raw: Value) -> Value {
        let formatted = self.run_formatters(raw);
        self.cast_one(formatted)
    }

    fn cast_one(&self, formatted: Value) -> Value {
        self.apply_set(cast(formatted, &self.value_type()))
    }

    fn run_formatters(&self, mut value: Value) -> Value {
        for (name, opt) in self.options.iter() {
            if let Some(f) = self.handlers.formatter(name) {
                value = f(opt, value, self);
            }
        }
        value
    }

    fn apply_set(&self, value: Value) -> Value {
        match self.option(keys::SET) {
            Some(OptionValue::Hook(set)) => set(value, self),
            _ => value,
        }
    }

    // --- parse ---

    /// This param's query fragment, built from the bound value.
    #[must_use]
    pub fn parse(&self) -> Document {
        self.parse_in(None)
    }

    /// Same as [`Param::parse`], with the owning schema visible to parsers.
    #[must_use]
    pub fn parse_in(&self, schema: Option<&Schema>) -> Document {
        if self.value.is_nil() {
            return Document::new();
        }
        let paths = self.paths();
        if paths.len() > 1 {
            let any: Vec<Bson> = paths
                .iter()
                .map(|p| Bson::Document(self.parse_path(&self.value, p, schema)))
                .collect();
            let mut query = Document::new();
            query.insert("$or", any);
            return query;
        }
        let path = paths.into_iter().next().unwrap_or_else(|| self.name.clone());
        self.parse_path(&self.value, &path, schema)
    }

    /// Binds `raw`, then parses.
    pub fn parse_value(&mut self, raw: impl Into<Value>) -> Document {
        self.set_value(raw);
        self.parse()
    }

    fn parse_path(&self, value: &Value, path: &str, schema: Option<&Schema>) -> Document {
        let mut operator = self.operator();
        if matches!(value, Value::Array(_)) {
            operator = if operator == "$ne" { "$nin" } else { "$in" };
        }
        // The last parser to run decides the fragment.
        let mut query = default_fragment(value, path, operator);
        for (name, opt) in self.options.iter() {
            if name == keys::PARSE {
                if let OptionValue::Parse(f) = opt {
                    query = f(value, path, operator, self, schema);
                }
            } else if let Some(parser) = self.handlers.parser(name) {
                query = parser(opt, value, path, operator, self, schema);
            }
        }
        query
    }

    // --- validate ---

    /// Checks the bound value; the first failing option is reported.
    ///
    /// # Errors
    /// Returns the first `ValidationError` in option order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_in(None)
    }

    /// # Errors
    /// Returns the first `ValidationError` in option order.
    pub fn validate_in(&self, schema: Option<&Schema>) -> Result<(), ValidationError> {
        self.check(&self.value, schema)
    }

    /// Formats `raw` without binding it and checks the result.
    ///
    /// # Errors
    /// Returns the first `ValidationError` in option order.
    pub fn validate_value(&self, raw: impl Into<Value>) -> Result<(), ValidationError> {
        let value = self.format(raw);
        self.check(&value, None)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn check(&self, value: &Value, schema: Option<&Schema>) -> Result<(), ValidationError> {
        let Value::Array(items) = value else {
            return self.run_validators(value, schema, |_| true);
        };
        // Length limits apply to the collection, everything else to each element.
        self.run_validators(value, schema, |name| builtins::COLLECTION_VALIDATORS.contains(&name))?;
        for item in items {
            self.run_validators(item, schema, |name| {
                !builtins::COLLECTION_VALIDATORS.contains(&name)
            })?;
        }
        Ok(())
    }

    fn run_validators(
        &self,
        value: &Value,
        schema: Option<&Schema>,
        applies: impl Fn(&str) -> bool,
    ) -> Result<(), ValidationError> {
        for (name, opt) in self.options.iter() {
            if !applies(name) {
                continue;
            }
            let Some(validator) = self.handlers.validator(name) else { continue };
            let outcome = validator(opt, value, self, schema);
            if !outcome.valid {
                return Err(ValidationError {
                    name: name.to_string(),
                    param: self.name.clone(),
                    value: value.clone(),
                    option: opt.echo(),
                    message: outcome.message,
                });
            }
        }
        Ok(())
    }
}

/// `{path: value}` for equality and patterns, `{path: {"$not": pattern}}` for a negated
/// pattern, `{path: {operator: value}}` otherwise.
#[must_use]
pub fn default_fragment(value: &Value, path: &str, operator: &str) -> Document {
    let bson = value.to_bson();
    let mut query = Document::new();
    match value {
        Value::Regex(_) if operator == "$ne" => {
            let mut not = Document::new();
            not.insert("$not", bson);
            query.insert(path, not);
        }
        Value::Regex(_) => {
            query.insert(path, bson);
        }
        _ if operator == "$eq" => {
            query.insert(path, bson);
        }
        _ => {
            let mut op = Document::new();
            op.insert(operator, bson);
            query.insert(path, op);
        }
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn param(value: impl Into<Value>, options: ParamOptions) -> Param {
        Param::new("test", value, options)
    }

    #[test]
    fn type_list_enables_multiple() {
        let p = param("1,2", ParamOptions::new().with(keys::TYPE, OptionValue::TypeList(ValueType::Number)));
        assert!(p.is_multiple());
        assert_eq!(p.value_type(), ValueType::Number);
        assert_eq!(p.value(), Value::from(vec![1, 2]));
    }

    #[test]
    fn inferred_type_from_initial_value() {
        assert_eq!(param(3, ParamOptions::new()).value_type(), ValueType::Number);
        let p = param(vec![true, false], ParamOptions::new());
        assert!(p.is_multiple());
        assert_eq!(p.value_type(), ValueType::Boolean);
    }

    #[test]
    fn regex_not_equal_wraps_in_not() {
        let p = param("abc", ParamOptions::new().with(keys::TYPE, ValueType::Regex).with(keys::OPERATOR, "$ne"));
        assert_eq!(p.parse(), doc! { "test": { "$not": { "$regex": "abc", "$options": "i" } } });
    }

    #[test]
    fn reset_rebinds_initial_value() {
        let mut p = param("first", ParamOptions::new());
        p.set_value("second");
        assert_eq!(p.reset(), Value::from("first"));
    }
}
