//! Declarative set of params that turns a raw request query into bucketed fragments.
//!
//! A schema owns its params, seeds them from the built-in table (`q`, `fields`, `near`,
//! `page`, `limit`, `sort`) merged with caller definitions, and keeps a handler registry
//! whose entries are pushed into every param it owns.

pub mod defaults;
mod merge;
mod options;
mod parsed;

pub use merge::merge_into;
pub use options::{ParamDef, SchemaOptions, Toggle};
pub use parsed::{ParsedQuery, RawQuery};

use bson::Document;

use crate::errors::QueryError;
use crate::handlers::{
    FormatterFn, Handler, HandlerKind, HandlerName, HandlerRegistry, ParserFn, ValidatorFn, global,
};
use crate::param::{OptionValue, Param, ParamOptions, Validation, ValidationError, keys};
use crate::value::Value;

/// How [`Schema::instantiate`] copies a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Instantiate {
    /// Deep copy including bound values.
    Snapshot,
    /// Deep copy with every param rebound to its construction-time value.
    #[default]
    Reset,
}

#[derive(Debug, Clone)]
pub struct Schema {
    options: SchemaOptions,
    params: Vec<Param>,
    handlers: HandlerRegistry,
    builtins: Vec<(String, ParamOptions)>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(Vec::<(String, ParamDef)>::new(), SchemaOptions::default())
    }
}

impl Schema {
    /// Builds a schema with a snapshot of the process-wide handlers.
    pub fn new<K, I>(defs: I, options: SchemaOptions) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ParamDef)>,
    {
        Self::with_registry(defs, options, &global::snapshot())
    }

    /// Builds a schema whose handlers start as a copy of `registry`.
    pub fn with_registry<K, I>(defs: I, options: SchemaOptions, registry: &HandlerRegistry) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ParamDef)>,
    {
        let mut schema = Self {
            options,
            params: Vec::new(),
            handlers: registry.clone(),
            builtins: defaults::table(),
        };

        let mut defs: Vec<(String, Option<ParamDef>)> =
            defs.into_iter().map(|(k, d)| (k.into(), Some(d))).collect();
        let mut names: Vec<String> = schema.builtins.iter().map(|(k, _)| k.clone()).collect();
        for (name, _) in &defs {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        for name in names {
            let def = defs.iter_mut().find(|(k, _)| *k == name).and_then(|(_, d)| d.take());
            schema.add(&name, Value::Null, def);
        }
        schema
    }

    // --- options ---

    #[must_use]
    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    #[must_use]
    pub fn option(&self, name: &str) -> Option<&Toggle> {
        self.options.get(name)
    }

    pub fn set_option(&mut self, name: &str, toggle: impl Into<Toggle>) -> &mut Self {
        self.options.set(name, toggle);
        self
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

    /// Registers a handler on the schema and every param it owns.
    ///
    /// # Errors
    /// Returns `QueryError::InvalidHandlerName` for an invalid name.
    pub fn set_handler(&mut self, name: &str, handler: Handler) -> Result<&mut Self, QueryError> {
        let name = HandlerName::new(name)?;
        log::debug!("registered schema {} handler {name}", handler.kind());
        let mut one = HandlerRegistry::new();
        one.insert(name.clone(), handler.clone());
        self.handlers.insert(name, handler);
        self.refresh_params(&one);
        Ok(self)
    }

    /// Registers every handler of `registry`, replacing same-named ones.
    pub fn extend_handlers(&mut self, registry: &HandlerRegistry) -> &mut Self {
        self.handlers.extend_from(registry);
        self.refresh_params(registry);
        self
    }

    fn refresh_params(&mut self, registry: &HandlerRegistry) {
        for param in &mut self.params {
            param.extend_handlers(registry);
        }
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
        self.set_handler(name, Handler::parser(f))
    }

    /// # Errors
    /// Returns `QueryError::InvalidHandlerName` for an invalid name.
    pub fn set_formatter<F>(&mut self, name: &str, f: F) -> Result<&mut Self, QueryError>
    where
        F: Fn(&OptionValue, Value, &Param) -> Value + Send + Sync + 'static,
    {
        self.set_handler(name, Handler::formatter(f))
    }

    /// # Errors
    /// Returns `QueryError::InvalidHandlerName` for an invalid name.
    pub fn set_validator<F>(&mut self, name: &str, f: F) -> Result<&mut Self, QueryError>
    where
        F: Fn(&OptionValue, &Value, &Param, Option<&Schema>) -> Validation + Send + Sync + 'static,
    {
        self.set_handler(name, Handler::validator(f))
    }

    // --- params ---

    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = self.schema_param_name(name);
        self.params.iter().position(|p| p.name() == name)
    }

    /// The param `name` refers to, by internal name or external alias.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Param> {
        self.position(name).map(|idx| &self.params[idx])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Param> {
        self.position(name).map(|idx| &mut self.params[idx])
    }

    /// Rebinds an existing param and assigns `options` over its own.
    /// `None` when there is no such param.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        options: Option<ParamOptions>,
    ) -> Option<&mut Param> {
        let param = self.get_mut(name)?;
        param.set_value(value);
        for (key, option) in options.unwrap_or_default().iter() {
            param.set_option(key, option.clone());
        }
        Some(param)
    }

    /// Adds or replaces a param.
    ///
    /// Options are `{bindTo: <default bucket>}`, then the built-in definition, then
    /// `def`. `None` when the schema options disable the name.
    pub fn add(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        def: Option<ParamDef>,
    ) -> Option<&mut Param> {
        let name = self.schema_param_name(name).to_string();
        if !self.options.is_enabled(&name) {
            log::trace!("param {name} is disabled");
            return None;
        }
        let mut options = ParamOptions::new().with(keys::BIND_TO, self.options.default_bucket());
        if let Some((_, builtin)) = self.builtins.iter().find(|(k, _)| *k == name) {
            options.merge(builtin.clone());
        }
        if let Some(def) = def {
            options.merge(def.into_options());
        }
        let mut param = Param::new(name.as_str(), value, options);
        if !self.handlers.is_empty() {
            // Rebind so schema handlers see the initial value too.
            param.extend_handlers(&self.handlers);
            param.reset();
        }
        let idx = self.store(param);
        if name == defaults::NEAR {
            self.add_distance_companions(idx);
        }
        Some(&mut self.params[idx])
    }

    /// Takes ownership of a constructed param, keyed by the internal name its own name
    /// resolves to. An aliased name replaces the param it aliases.
    pub fn add_param(&mut self, mut param: Param) -> Option<&mut Param> {
        let name = self.schema_param_name(param.name()).to_string();
        if !self.options.is_enabled(&name) {
            log::trace!("param {name} is disabled");
            return None;
        }
        if name != param.name() {
            log::debug!("param {} stored as {name}", param.name());
            param.rename(name);
        }
        if !self.handlers.is_empty() {
            param.extend_handlers(&self.handlers);
            param.reset();
        }
        let idx = self.store(param);
        Some(&mut self.params[idx])
    }

    /// `set` when the param exists, `add` otherwise.
    pub fn param(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        def: Option<ParamDef>,
    ) -> Option<&mut Param> {
        if self.get(name).is_some() {
            self.set(name, value, def.map(ParamDef::into_options))
        } else {
            self.add(name, value, def)
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Param> {
        self.position(name).map(|idx| self.params.remove(idx))
    }

    fn store(&mut self, mut param: Param) -> usize {
        param.extend_handlers(&self.handlers);
        match self.params.iter().position(|p| p.name() == param.name()) {
            Some(idx) => {
                self.params[idx] = param;
                idx
            }
            None => {
                self.params.push(param);
                self.params.len() - 1
            }
        }
    }

    fn add_distance_companions(&mut self, near: usize) {
        for key in [keys::MIN_DISTANCE, keys::MAX_DISTANCE] {
            let wanted = self.params[near].option(key).is_some_and(OptionValue::is_truthy);
            if wanted && self.get(key).is_none() {
                log::debug!("materialized near companion {key}");
                let options = defaults::distance_companion(key);
                self.add(key, Value::Null, Some(ParamDef::Options(options)));
            }
        }
    }

    // --- names ---

    /// Internal name for an external one.
    #[must_use]
    pub fn schema_param_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.options.aliased_by(name).unwrap_or(name)
    }

    /// External name for an internal one.
    #[must_use]
    pub fn query_param_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.options.alias(name).unwrap_or(name)
    }

    // --- request ---

    fn bind(&mut self, raw: &RawQuery) {
        for idx in 0..self.params.len() {
            let external = self.query_param_name(self.params[idx].name()).to_string();
            if let Some(value) = raw.get(&external).filter(|v| !v.is_nil()) {
                self.params[idx].set_value(value.clone());
            }
        }
    }

    /// Binds `raw` and collects every enabled param's fragment into its bucket.
    ///
    /// A non-empty `near` fragment switches `sort` off for this schema.
    pub fn parse(&mut self, raw: &RawQuery) -> ParsedQuery {
        self.bind(raw);
        let mut buckets = Document::new();
        for idx in 0..self.params.len() {
            let param = &self.params[idx];
            if !self.options.is_enabled(param.name()) {
                continue;
            }
            let bucket = param.bind_to().to_string();
            let fragment = param.parse_in(Some(self));
            if param.name() == defaults::NEAR && !fragment.is_empty() {
                self.options.set(defaults::SORT, false);
            }
            if !buckets.contains_key(&bucket) {
                buckets.insert(bucket.clone(), Document::new());
            }
            if let Ok(target) = buckets.get_document_mut(&bucket) {
                merge_into(target, fragment);
            }
        }
        ParsedQuery::new(buckets, self.options.default_bucket())
    }

    /// Binds `raw` and checks every param in order; the first failure is returned.
    ///
    /// # Errors
    /// Returns the first `ValidationError` found.
    pub fn validate(&mut self, raw: &RawQuery) -> Result<(), ValidationError> {
        self.bind(raw);
        for param in &self.params {
            if let Err(error) = param.validate_in(Some(self)) {
                log::debug!(
                    target: crate::logger::VALIDATION_TARGET,
                    "param {} failed {}: {}",
                    error.param,
                    error.name,
                    error.message
                );
                return Err(error);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.params.iter().all(|p| p.validate_in(Some(self)).is_ok())
    }

    /// Request-scoped copy of this schema.
    #[must_use]
    pub fn instantiate(&self, mode: Instantiate) -> Self {
        let mut copy = self.clone();
        if mode == Instantiate::Reset {
            for param in &mut copy.params {
                param.reset();
            }
        }
        copy
    }
}
