//! In-process document store used for `memory://` endpoints and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{compare_by_field, Document, DocumentStore, Filter, FindOptions, ID_FIELD};

/// Collections kept in insertion order behind a single lock.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn id_of(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(|v| v.as_str())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| id_of(d) == Some(id)))
            .cloned())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        let mut found: Vec<Document> = {
            let collections = self.collections.read().await;
            collections
                .get(collection)
                .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
                .unwrap_or_default()
        };

        if let Some(field) = &options.sort {
            found.sort_by(|a, b| compare_by_field(a, b, field));
        }

        Ok(found)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)))
            .cloned())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<()> {
        let id = id_of(&doc)
            .ok_or_else(|| StoreError::MissingId(collection.to_string()))?
            .to_string();

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| id_of(d) == Some(id.as_str())) {
            return Err(StoreError::DuplicateId {
                collection: collection.to_string(),
                id,
            });
        }

        docs.push(doc);
        Ok(())
    }

    async fn replace(&self, collection: &str, id: &str, mut doc: Document) -> Result<bool> {
        doc.insert(ID_FIELD.to_string(), id.into());

        let mut collections = self.collections.write().await;
        let slot = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| id_of(d) == Some(id)));

        match slot {
            Some(existing) => {
                *existing = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };

        Ok(docs
            .iter()
            .position(|d| id_of(d) == Some(id))
            .map(|index| docs.remove(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert("genres", doc(json!({"_id": "g2", "name": "Poetry"})))
            .await
            .unwrap();
        store
            .insert("genres", doc(json!({"_id": "g1", "name": "Fantasy"})))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn find_by_id_on_unknown_collection_is_none() {
        let store = MemoryStore::new();
        assert!(store.find_by_id("authors", "a1").await.unwrap().is_none());
        assert_eq!(store.count("authors", &Filter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_sorts_when_asked() {
        let store = seeded().await;

        let natural = store
            .find("genres", &Filter::all(), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(natural[0]["name"], "Poetry");

        let sorted = store
            .find("genres", &Filter::all(), &FindOptions::sorted_by("name"))
            .await
            .unwrap();
        let names: Vec<&str> = sorted.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Fantasy", "Poetry"]);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_ids() {
        let store = seeded().await;
        let err = store
            .insert("genres", doc(json!({"_id": "g1", "name": "Other"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
    }

    #[tokio::test]
    async fn insert_requires_an_id() {
        let store = MemoryStore::new();
        let err = store
            .insert("genres", doc(json!({"name": "Other"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingId(_)));
    }

    #[tokio::test]
    async fn replace_overwrites_every_field() {
        let store = MemoryStore::new();
        store
            .insert(
                "authors",
                doc(json!({"_id": "a1", "first_name": "Ann", "date_of_birth": "1900-01-01"})),
            )
            .await
            .unwrap();

        let replaced = store
            .replace("authors", "a1", doc(json!({"first_name": "Anna"})))
            .await
            .unwrap();
        assert!(replaced);

        let stored = store.find_by_id("authors", "a1").await.unwrap().unwrap();
        assert_eq!(stored["first_name"], "Anna");
        assert!(stored.get("date_of_birth").is_none());
        assert_eq!(stored["_id"], "a1");

        assert!(!store
            .replace("authors", "missing", doc(json!({})))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn delete_twice_returns_none_the_second_time() {
        let store = seeded().await;

        let first = store.delete("genres", "g1").await.unwrap();
        assert_eq!(first.unwrap()["name"], "Fantasy");

        assert!(store.delete("genres", "g1").await.unwrap().is_none());
        assert_eq!(store.count("genres", &Filter::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn count_applies_filter() {
        let store = seeded().await;
        let fantasy = Filter::all().eq_ignore_case("name", "fantasy");
        assert_eq!(store.count("genres", &fantasy).await.unwrap(), 1);
        assert_eq!(
            store.find_one("genres", &fantasy).await.unwrap().unwrap()["_id"],
            "g1"
        );
    }
}
