//! Error types and result types for data-access operations.
//!
//! Every fallible operation in the workspace returns [`DocumentStoreResult<T>`].
//! Backend failures are wrapped with their native message and surfaced to the
//! immediate caller; nothing here retries.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// A data operation was attempted before a successful connect or after disconnect.
    #[error("Not connected to a backend")]
    NotConnected,
    /// A connect attempt was made without the backend's required credential fields.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during backend initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The requested collection does not exist in the catalog.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// Another collection definition already owns this name.
    #[error("Collection already exists: {0}")]
    CollectionAlreadyExists(String),
    /// The document has an invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The query or search request is malformed.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// The connected backend cannot provide the requested guarantee or collaborator.
    #[error("Unsupported: {0}")]
    Unsupported(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns `true` for [`DocumentNotFound`](Self::DocumentNotFound) and
    /// [`CollectionNotFound`](Self::CollectionNotFound).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::DocumentNotFound(..) | DocumentStoreError::CollectionNotFound(_)
        )
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
