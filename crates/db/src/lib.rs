//! Document store access for the local library service.
//!
//! The database driver is an external collaborator: everything above this
//! crate talks to [`DocumentStore`]. The bundled [`MemoryStore`] backs
//! `memory://` endpoints and the test suites.

use std::sync::Arc;

use locallib_kernel::settings::DatabaseSettings;

pub mod error;
pub mod memory;
pub mod repository;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use repository::{Record, RecordId, Repository};
pub use store::{Document, DocumentStore, Filter, FindOptions};

/// Open the long-lived store handle described by the settings.
pub fn connect(settings: &DatabaseSettings) -> Result<Arc<dyn DocumentStore>> {
    let scheme = settings
        .endpoint
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .unwrap_or_default();

    match scheme {
        "memory" => {
            tracing::info!(
                target: "locallib-db",
                database = %settings.name,
                "using in-memory document store"
            );
            Ok(Arc::new(MemoryStore::new()))
        }
        _ => Err(StoreError::UnsupportedEndpoint(settings.endpoint.clone())),
    }
}

/// Create every named collection up front.
pub async fn prepare_collections(store: &dyn DocumentStore, collections: &[&str]) -> Result<()> {
    for collection in collections {
        tracing::debug!(target: "locallib-db", collection, "ensuring collection");
        store.ensure_collection(collection).await?;
    }
    Ok(())
}
