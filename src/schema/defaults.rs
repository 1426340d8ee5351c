//! Parameters every schema starts with.

use bson::{Bson, Document, doc};

use crate::param::{OptionValue, Param, ParamOptions, keys};
use crate::schema::Schema;
use crate::value::{Value, ValueType, number_to_bson};

pub const Q: &str = "q";
pub const FIELDS: &str = "fields";
pub const NEAR: &str = "near";
pub const PAGE: &str = "page";
pub const LIMIT: &str = "limit";
pub const SORT: &str = "sort";

/// Mean Earth radius in meters; legacy `$near` distances are given in radians.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const DEFAULT_LIMIT: f64 = 30.0;

/// Fresh copy of the built-in definitions, in declaration order.
pub(crate) fn table() -> Vec<(String, ParamOptions)> {
    vec![
        (
            Q.to_string(),
            ParamOptions::new()
                .with(keys::TYPE, ValueType::Regex)
                .with(keys::NORMALIZE, true)
                .with(keys::PATHS, vec!["keywords"]),
        ),
        (
            FIELDS.to_string(),
            ParamOptions::new()
                .with(keys::TYPE, OptionValue::TypeList(ValueType::String))
                .with(keys::BIND_TO, "select")
                .with(keys::PARSE, OptionValue::parse(|value, _, _, _, _| projection(value))),
        ),
        (
            NEAR.to_string(),
            ParamOptions::new()
                .with(keys::TYPE, OptionValue::TypeList(ValueType::Number))
                .with(keys::MAXLENGTH, 2)
                .with(keys::MINLENGTH, 2)
                .with(keys::MAX, 180)
                .with(keys::MIN, -180)
                .with(keys::PATHS, vec!["location"])
                .with(keys::MAX_DISTANCE, true)
                .with(keys::MIN_DISTANCE, true)
                .with(keys::GEOJSON, true)
                .with(keys::PARSE, OptionValue::parse(near)),
        ),
        (
            PAGE.to_string(),
            ParamOptions::new()
                .with(keys::TYPE, ValueType::Number)
                .with(keys::DEFAULT, 1)
                .with(keys::MAX, 30)
                .with(keys::MIN, 1)
                .with(keys::BIND_TO, "cursor")
                .with(keys::PARSE, OptionValue::parse(|value, _, _, _, schema| skip(value, schema))),
        ),
        (
            LIMIT.to_string(),
            ParamOptions::new()
                .with(keys::TYPE, ValueType::Number)
                .with(keys::DEFAULT, 30)
                .with(keys::MAX, 100)
                .with(keys::MIN, 1)
                .with(keys::BIND_TO, "cursor")
                .with(keys::PARSE, OptionValue::parse(|value, _, _, _, _| {
                    let mut query = Document::new();
                    query.insert("limit", value.to_bson());
                    query
                })),
        ),
        (
            SORT.to_string(),
            ParamOptions::new()
                .with(keys::TYPE, OptionValue::TypeList(ValueType::String))
                .with(keys::DEFAULT, "-createdAt")
                .with(keys::BIND_TO, "cursor")
                .with(keys::PARSE, OptionValue::parse(|value, _, _, _, _| {
                    doc! { "sort": signed_fields(value, -1) }
                })),
        ),
    ]
}

/// Options of the distance companions `near` materializes.
pub(crate) fn distance_companion(name: &str) -> ParamOptions {
    let options = ParamOptions::new().with(keys::TYPE, ValueType::Number);
    let options = if name == keys::MIN_DISTANCE { options.with(keys::MIN, 0) } else { options };
    options.with(keys::PARSE, OptionValue::parse(|_, _, _, _, _| Document::new()))
}

fn tokens(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items.iter().map(Value::to_text).collect(),
        other => vec![other.to_text()],
    };
    items.into_iter().filter(|t| !t.is_empty()).collect()
}

/// `-name` maps to `minus`, `+name` and `name` to 1.
fn signed_fields(value: &Value, minus: i32) -> Document {
    let mut fields = Document::new();
    for token in tokens(value) {
        let (name, dir) = match token.as_bytes()[0] {
            b'-' => (&token[1..], minus),
            b'+' => (&token[1..], 1),
            _ => (token.as_str(), 1),
        };
        if !name.is_empty() {
            fields.insert(name, dir);
        }
    }
    fields
}

fn projection(value: &Value) -> Document {
    let rewritten: Vec<Value> = tokens(value)
        .into_iter()
        .map(|t| match t.as_str() {
            "id" | "+id" | "-id" => Value::String(t.replacen("id", "_id", 1)),
            _ => Value::String(t),
        })
        .collect();
    signed_fields(&Value::Array(rewritten), 0)
}

fn skip(page: &Value, schema: Option<&Schema>) -> Document {
    let limit = schema
        .and_then(|s| s.get(LIMIT))
        .and_then(|p| p.value().as_f64())
        .unwrap_or(DEFAULT_LIMIT);
    let page = page.as_f64().unwrap_or(f64::NAN);
    let mut query = Document::new();
    query.insert("skip", number_to_bson(limit * (page - 1.0)));
    query
}

fn distance(schema: Option<&Schema>, name: &str) -> Option<f64> {
    let param = schema?.get(name)?;
    let value = param.value();
    if !value.is_truthy() {
        return None;
    }
    value.as_f64()
}

/// `[lat, lng]` becomes a GeoJSON point query, or a legacy coordinate pair with
/// radian distances when `geojson` is off.
fn near(value: &Value, path: &str, _: &str, param: &Param, schema: Option<&Schema>) -> Document {
    let coords: Vec<f64> = value
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default();
    let &[lat, lng] = coords.as_slice() else {
        return Document::new();
    };
    let min = distance(schema, keys::MIN_DISTANCE);
    let max = distance(schema, keys::MAX_DISTANCE);

    let mut constraint = Document::new();
    if param.option(keys::GEOJSON).is_some_and(OptionValue::is_truthy) {
        let mut near = doc! {
            "$geometry": { "type": "Point", "coordinates": [lng, lat] }
        };
        if let Some(min) = min {
            near.insert("$minDistance", Bson::Double(min));
        }
        if let Some(max) = max {
            near.insert("$maxDistance", Bson::Double(max));
        }
        constraint.insert("$near", near);
    } else {
        constraint.insert("$near", vec![Bson::Double(lng), Bson::Double(lat)]);
        if let Some(min) = min {
            constraint.insert("$minDistance", Bson::Double(min / EARTH_RADIUS_M));
        }
        if let Some(max) = max {
            constraint.insert("$maxDistance", Bson::Double(max / EARTH_RADIUS_M));
        }
    }
    let mut query = Document::new();
    query.insert(path, constraint);
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_tokens() {
        let v = Value::from(vec!["-createdAt", "name", "+test", ""]);
        assert_eq!(signed_fields(&v, -1), doc! { "createdAt": -1, "name": 1, "test": 1 });
    }

    #[test]
    fn projection_rewrites_exact_id_only() {
        let v = Value::from(vec!["-id", "identity", "+name"]);
        assert_eq!(projection(&v), doc! { "_id": 0, "identity": 1, "name": 1 });
    }

    #[test]
    fn skip_without_schema_uses_default_limit() {
        assert_eq!(skip(&Value::from(3), None), doc! { "skip": 60 });
    }
}
