//! Typed access to a collection of records.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{Document, DocumentStore, Filter, FindOptions};

/// Opaque record identity as stored under `_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Fresh, time-ordered identity.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Value::String(id.0)
    }
}

impl From<&RecordId> for Value {
    fn from(id: &RecordId) -> Self {
        Value::String(id.0.clone())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted record type bound to one collection.
///
/// The serialized form must be a JSON object carrying the id under `_id`.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &RecordId;
}

/// Typed repository over a shared store handle.
pub struct Repository<R> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<R: Record> Repository<R> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub async fn get(&self, id: &RecordId) -> Result<Option<R>> {
        self.store
            .find_by_id(R::COLLECTION, id.as_str())
            .await?
            .map(decode::<R>)
            .transpose()
    }

    pub async fn exists(&self, id: &RecordId) -> Result<bool> {
        Ok(self
            .store
            .find_by_id(R::COLLECTION, id.as_str())
            .await?
            .is_some())
    }

    pub async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<R>> {
        self.store
            .find(R::COLLECTION, filter, options)
            .await?
            .into_iter()
            .map(decode::<R>)
            .collect()
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<R>> {
        self.store
            .find_one(R::COLLECTION, filter)
            .await?
            .map(decode::<R>)
            .transpose()
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64> {
        self.store.count(R::COLLECTION, filter).await
    }

    pub async fn insert(&self, record: &R) -> Result<()> {
        self.store.insert(R::COLLECTION, encode(record)?).await
    }

    /// Full replace of an existing record. Returns false when it no longer exists.
    pub async fn replace(&self, record: &R) -> Result<bool> {
        self.store
            .replace(R::COLLECTION, record.id().as_str(), encode(record)?)
            .await
    }

    pub async fn delete(&self, id: &RecordId) -> Result<Option<R>> {
        self.store
            .delete(R::COLLECTION, id.as_str())
            .await?
            .map(decode::<R>)
            .transpose()
    }
}

fn encode<R: Record>(record: &R) -> Result<Document> {
    match serde_json::to_value(record) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(StoreError::MissingId(R::COLLECTION.to_string())),
        Err(source) => Err(StoreError::Encode {
            collection: R::COLLECTION,
            source,
        }),
    }
}

fn decode<R: Record>(doc: Document) -> Result<R> {
    serde_json::from_value(Value::Object(doc)).map_err(|source| StoreError::Decode {
        collection: R::COLLECTION.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Shelf {
        #[serde(rename = "_id")]
        id: RecordId,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    }

    impl Record for Shelf {
        const COLLECTION: &'static str = "shelves";

        fn id(&self) -> &RecordId {
            &self.id
        }
    }

    fn repo() -> Repository<Shelf> {
        Repository::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(RecordId::generate(), RecordId::generate());
    }

    #[tokio::test]
    async fn typed_round_trip_through_store() {
        let shelves = repo();
        let shelf = Shelf {
            id: RecordId::generate(),
            label: "A".into(),
            note: Some("top".into()),
        };
        shelves.insert(&shelf).await.unwrap();

        assert_eq!(shelves.get(&shelf.id).await.unwrap(), Some(shelf.clone()));
        assert!(shelves.exists(&shelf.id).await.unwrap());
        assert!(!shelves.exists(&RecordId::from("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn replace_clears_omitted_optionals() {
        let shelves = repo();
        let mut shelf = Shelf {
            id: RecordId::generate(),
            label: "A".into(),
            note: Some("top".into()),
        };
        shelves.insert(&shelf).await.unwrap();

        shelf.note = None;
        assert!(shelves.replace(&shelf).await.unwrap());
        assert_eq!(shelves.get(&shelf.id).await.unwrap().unwrap().note, None);
    }

    #[tokio::test]
    async fn decode_failure_surfaces_as_store_error() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(
                "shelves",
                serde_json::json!({"_id": "s1"}).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();

        let shelves: Repository<Shelf> = Repository::new(store);
        let err = shelves.get(&RecordId::from("s1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }
}
