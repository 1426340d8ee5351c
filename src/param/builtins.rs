//! Formatters and validators every param starts with.

use std::sync::LazyLock;

use super::options::{OptionValue, keys};
use super::validate::Validation;
use crate::handlers::{Handler, HandlerName, HandlerRegistry};
use crate::value::{Value, normalize};

static BUILTINS: LazyLock<HandlerRegistry> = LazyLock::new(|| {
    let mut reg = HandlerRegistry::new();
    let mut add = |name: &'static str, handler: Handler| {
        reg.insert(HandlerName::builtin(name), handler);
    };

    add(keys::DEFAULT, Handler::formatter(|opt, value, param| {
        if !value.is_blank() {
            return value;
        }
        match opt {
            OptionValue::Default(f) => f(param),
            other => other.echo(),
        }
    }));
    add(keys::NORMALIZE, Handler::formatter(|opt, value, _| {
        map_text(opt, value, normalize)
    }));
    add(keys::LOWERCASE, Handler::formatter(|opt, value, _| {
        map_text(opt, value, |s| s.to_lowercase())
    }));
    add(keys::UPPERCASE, Handler::formatter(|opt, value, _| {
        map_text(opt, value, |s| s.to_uppercase())
    }));
    add(keys::TRIM, Handler::formatter(|opt, value, _| {
        map_text(opt, value, |s| s.trim().to_string())
    }));

    add(keys::REQUIRED, Handler::validator(|opt, value, param, _| {
        Validation::check(
            !opt.is_truthy() || !value.is_blank(),
            format!("{} is required", param.name()),
        )
    }));
    add(keys::MIN, Handler::validator(|opt, value, param, _| {
        let Some(min) = opt.as_number() else { return Validation::ok() };
        Validation::check(
            value.is_nil() || value.as_f64().is_some_and(|v| v >= min),
            format!("{} must be greater than or equal to {}", param.name(), opt.echo()),
        )
    }));
    add(keys::MAX, Handler::validator(|opt, value, param, _| {
        let Some(max) = opt.as_number() else { return Validation::ok() };
        Validation::check(
            value.is_nil() || value.as_f64().is_some_and(|v| v <= max),
            format!("{} must be lower than or equal to {}", param.name(), opt.echo()),
        )
    }));
    add(keys::MINLENGTH, Handler::validator(|opt, value, param, _| {
        let Some(min) = opt.as_number() else { return Validation::ok() };
        Validation::check(
            value.is_nil() || value.len().is_some_and(|l| as_f64(l) >= min),
            format!("{} must have length greater than or equal to {}", param.name(), opt.echo()),
        )
    }));
    add(keys::MAXLENGTH, Handler::validator(|opt, value, param, _| {
        let Some(max) = opt.as_number() else { return Validation::ok() };
        Validation::check(
            value.is_nil() || value.len().is_some_and(|l| as_f64(l) <= max),
            format!("{} must have length lower than or equal to {}", param.name(), opt.echo()),
        )
    }));
    add(keys::ENUM, Handler::validator(|opt, value, param, _| {
        let Some(allowed) = opt.as_value().and_then(Value::as_array) else {
            return Validation::ok();
        };
        let listed = allowed.iter().map(Value::to_text).collect::<Vec<_>>().join(", ");
        Validation::check(
            value.is_nil() || allowed.contains(value),
            format!("{} must be one of: {listed}", param.name()),
        )
    }));
    add(keys::MATCH, Handler::validator(|opt, value, param, _| {
        let Some(pattern) = opt.as_value().and_then(Value::as_pattern) else {
            return Validation::ok();
        };
        Validation::check(
            value.is_nil() || pattern.is_match(&value.to_text()),
            format!("{} must match regular expression {pattern}", param.name()),
        )
    }));
    reg
});

/// Length validators that look at a multi-value param's collection as a whole.
pub(crate) const COLLECTION_VALIDATORS: [&str; 2] = [keys::MINLENGTH, keys::MAXLENGTH];

pub(crate) fn registry() -> HandlerRegistry {
    BUILTINS.clone()
}

fn map_text(opt: &OptionValue, value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) if opt.is_truthy() => Value::String(f(&s)),
        other => other,
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(n: usize) -> f64 {
    n as f64
}
