use bson::{Bson, Document};
use std::sync::LazyLock;

use crate::value::Value;

static EMPTY: LazyLock<Document> = LazyLock::new(Document::new);

/// Output of [`crate::Schema::parse`]: one fragment document per bucket in use.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    buckets: Document,
    query_bucket: String,
}

impl ParsedQuery {
    pub(crate) fn new(buckets: Document, query_bucket: impl Into<String>) -> Self {
        Self { buckets, query_bucket: query_bucket.into() }
    }

    /// Filter criteria, read from the schema's default bucket.
    #[must_use]
    pub fn query(&self) -> &Document {
        self.bucket(&self.query_bucket).unwrap_or(&*EMPTY)
    }

    /// Field projection.
    #[must_use]
    pub fn select(&self) -> &Document {
        self.bucket("select").unwrap_or(&*EMPTY)
    }

    /// Cursor options: `limit`, `skip`, `sort`.
    #[must_use]
    pub fn cursor(&self) -> &Document {
        self.bucket("cursor").unwrap_or(&*EMPTY)
    }

    #[must_use]
    pub fn bucket(&self, name: &str) -> Option<&Document> {
        self.buckets.get_document(name).ok()
    }

    #[must_use]
    pub fn as_document(&self) -> &Document {
        &self.buckets
    }

    #[must_use]
    pub fn into_document(self) -> Document {
        self.buckets
    }

    /// Relaxed extended JSON rendering.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        Bson::Document(self.buckets.clone()).into_relaxed_extjson()
    }
}

/// Raw request parameters by external name, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQuery {
    entries: Vec<(String, Value)>,
}

impl RawQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes an `application/x-www-form-urlencoded` string. A leading `?` is ignored.
    #[must_use]
    pub fn parse(qs: &str) -> Self {
        let qs = qs.strip_prefix('?').unwrap_or(qs);
        url::form_urlencoded::parse(qs.as_bytes())
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect()
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds a value; a repeated name collects its values into an array.
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let Some(idx) = self.entries.iter().position(|(k, _)| k == name) else {
            self.entries.push((name.to_string(), value));
            return;
        };
        match &mut self.entries[idx].1 {
            Value::Array(items) => items.push(value),
            existing => {
                let first = std::mem::take(existing);
                *existing = Value::Array(vec![first, value]);
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for RawQuery {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut raw = Self::new();
        for (k, v) in iter {
            raw.insert(k.as_ref(), v);
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn query_string_decoding() {
        let raw = RawQuery::parse("?q=caf%C3%A9+bar&tag=a&tag=b");
        assert_eq!(raw.get("q"), Some(&Value::from("café bar")));
        assert_eq!(raw.get("tag"), Some(&Value::from(vec!["a", "b"])));
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn missing_buckets_read_as_empty() {
        let parsed = ParsedQuery::new(doc! { "query": { "a": 1 } }, "query");
        assert_eq!(parsed.query(), &doc! { "a": 1 });
        assert!(parsed.cursor().is_empty());
        assert!(parsed.bucket("select").is_none());
        assert_eq!(parsed.to_json(), serde_json::json!({ "query": { "a": 1 } }));
    }
}
