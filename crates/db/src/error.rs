use thiserror::Error;

/// Failures raised by a document store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document in '{collection}' could not be encoded: {source}")]
    Encode {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("document in '{collection}' could not be decoded: {source}")]
    Decode {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("document in '{0}' has no string `_id`")]
    MissingId(String),

    #[error("duplicate id '{id}' in collection '{collection}'")]
    DuplicateId { collection: String, id: String },

    #[error("unsupported store endpoint '{0}'")]
    UnsupportedEndpoint(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
