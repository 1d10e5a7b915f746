//! Backend-neutral document store interface.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

/// A stored document. Every document carries its identity under [`ID_FIELD`].
pub type Document = Map<String, Value>;

/// Field holding a document's identity.
pub const ID_FIELD: &str = "_id";

/// A single match condition on a document field.
///
/// Array-valued fields match when any element satisfies the condition.
#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq { field: String, value: Value },
    EqIgnoreCase { field: String, value: String },
    NotEq { field: String, value: Value },
}

impl Condition {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Condition::Eq { field, value } => field_matches(doc, field, |v| v == value),
            Condition::EqIgnoreCase { field, value } => {
                let wanted = value.to_lowercase();
                field_matches(doc, field, |v| {
                    v.as_str().is_some_and(|s| s.to_lowercase() == wanted)
                })
            }
            Condition::NotEq { field, value } => !field_matches(doc, field, |v| v == value),
        }
    }
}

fn field_matches(doc: &Document, field: &str, pred: impl Fn(&Value) -> bool) -> bool {
    match doc.get(field) {
        Some(Value::Array(items)) => items.iter().any(&pred),
        Some(value) => pred(value),
        None => false,
    }
}

/// Conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Case-insensitive string equality (collation strength 2).
    pub fn eq_ignore_case(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push(Condition::EqIgnoreCase {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn not_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::NotEq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }
}

/// Options applied to multi-document reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Ascending sort key; natural order when absent.
    pub sort: Option<String>,
}

impl FindOptions {
    pub fn sorted_by(field: impl Into<String>) -> Self {
        Self {
            sort: Some(field.into()),
        }
    }
}

/// Orders two documents by `field` ascending. Missing and null values sort first.
pub fn compare_by_field(a: &Document, b: &Document, field: &str) -> Ordering {
    compare_values(a.get(field), b.get(field))
}

pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Long-lived handle to a document database, shared by all requests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the backend, for logs.
    fn backend(&self) -> &'static str;

    /// Make sure a collection exists. Idempotent.
    async fn ensure_collection(&self, collection: &str) -> Result<()>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64>;

    /// Insert a new document. Fails with `DuplicateId` when the id is taken.
    async fn insert(&self, collection: &str, doc: Document) -> Result<()>;

    /// Replace the whole document with the given id. Returns false when absent.
    async fn replace(&self, collection: &str, id: &str, doc: Document) -> Result<bool>;

    /// Remove and return the document with the given id.
    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Document>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::all().matches(&doc(json!({"_id": "1"}))));
    }

    #[test]
    fn eq_matches_array_members() {
        let book = doc(json!({"_id": "b1", "genre": ["g1", "g2"]}));
        assert!(Filter::all().eq("genre", "g2").matches(&book));
        assert!(!Filter::all().eq("genre", "g3").matches(&book));
    }

    #[test]
    fn eq_ignore_case_compares_lowercased() {
        let genre = doc(json!({"_id": "g1", "name": "Fantasy"}));
        assert!(Filter::all().eq_ignore_case("name", "fANTASY").matches(&genre));
        assert!(!Filter::all().eq_ignore_case("name", "Fantasia").matches(&genre));
    }

    #[test]
    fn not_eq_excludes_matching_value() {
        let genre = doc(json!({"_id": "g1", "name": "Fantasy"}));
        assert!(!Filter::all().not_eq("_id", "g1").matches(&genre));
        assert!(Filter::all().not_eq("_id", "g2").matches(&genre));
    }

    #[test]
    fn missing_values_sort_first() {
        let a = doc(json!({"title": "B"}));
        let b = doc(json!({}));
        assert_eq!(compare_by_field(&a, &b, "title"), Ordering::Greater);
        assert_eq!(compare_by_field(&b, &b, "title"), Ordering::Equal);
    }
}
