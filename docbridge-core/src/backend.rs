//! Storage backend abstraction.
//!
//! This module defines the capability interface every document store
//! implements, so that the catalog, document store, batch engine, query
//! translator and search engine work unchanged over a hierarchical store and a
//! flat collection store.
//!
//! # Overview
//!
//! The [`StoreBackend`] trait provides a unified async interface for reading,
//! counting, and querying documents, and for committing a [`WriteBatch`] of
//! writes as one unit. Backends differ in what they can guarantee natively;
//! those differences are advertised through [`BackendCapabilities`] rather than
//! hidden.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait that performs the connect step
//!
//! # Examples
//!
//! ```ignore
//! use docbridge::backend::{StoreBackend, WriteBatch};
//! use bson::doc;
//!
//! let id = backend.allocate_id();
//! let mut batch = WriteBatch::new();
//! batch.insert("users", id.clone(), doc! { "name": "Alice" });
//! backend.commit(batch).await?;
//!
//! let docs = backend.get_documents(vec![id], "users").await?;
//! assert_eq!(docs.len(), 1);
//! ```

use async_trait::async_trait;
use bson::Document;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::DocumentStoreResult,
    query::{NativeQuery, Predicate},
    record::StoredDocument,
};

/// The two families of document stores this layer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Path-addressed collections of documents, Firestore-style.
    Hierarchical,
    /// Flat named collections, MongoDB-style.
    Flat,
}

/// What a backend can guarantee natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// A [`WriteBatch`] with several writes commits all-or-nothing.
    ///
    /// When `false`, callers must not submit multi-write batches; the batch
    /// engine rejects them with [`Unsupported`](crate::error::DocumentStoreError::Unsupported).
    pub atomic_batches: bool,
    /// [`NativeQuery::start_after`] is honored, so offsets can be expressed as
    /// a resume cursor instead of a native skip.
    pub cursor_resume: bool,
    /// Upper bound on writes in one batch, if the backend imposes one.
    pub max_batch_writes: Option<usize>,
}

/// A single write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Creates a document. Fails the batch if the id is already taken.
    Insert {
        collection: String,
        id: String,
        document: Document,
    },
    /// Merges `patch` over an existing document. Fails the batch if the id does not resolve.
    Update {
        collection: String,
        id: String,
        patch: Document,
    },
    /// Deletes a document. Missing ids are skipped.
    Delete { collection: String, id: String },
}

impl WriteOp {
    /// Returns the collection this write targets.
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Insert { collection, .. }
            | WriteOp::Update { collection, .. }
            | WriteOp::Delete { collection, .. } => collection,
        }
    }

    /// Returns the document id this write targets.
    pub fn id(&self) -> &str {
        match self {
            WriteOp::Insert { id, .. } | WriteOp::Update { id, .. } | WriteOp::Delete { id, .. } => id,
        }
    }
}

/// An ordered group of writes committed as one unit.
///
/// Writes may span collections, which the catalog relies on to remove a
/// collection's data and its definition together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a document creation.
    pub fn insert(&mut self, collection: &str, id: impl Into<String>, document: Document) -> &mut Self {
        self.ops.push(WriteOp::Insert {
            collection: collection.to_string(),
            id: id.into(),
            document,
        });
        self
    }

    /// Queues a merge update.
    pub fn update(&mut self, collection: &str, id: impl Into<String>, patch: Document) -> &mut Self {
        self.ops.push(WriteOp::Update {
            collection: collection.to_string(),
            id: id.into(),
            patch,
        });
        self
    }

    /// Queues a deletion.
    pub fn delete(&mut self, collection: &str, id: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Abstract interface for document storage backends.
///
/// Implementers of this trait provide one live session against a concrete
/// store. Documents are addressed by a backend-native string id and by the
/// name of the collection (or collection path) that holds them; the stored
/// document never carries its own id.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from
/// multiple async tasks.
///
/// # Sessions
///
/// A backend is connected when built by its [`StoreBackendBuilder`] and torn
/// down by [`shutdown`](StoreBackend::shutdown). Any call made after shutdown
/// must fail with [`NotConnected`](crate::error::DocumentStoreError::NotConnected)
/// or a [`Backend`](crate::error::DocumentStoreError::Backend) error; it must
/// never act on a dangling handle.
///
/// # Error Handling
///
/// Native failures are wrapped in
/// [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend)
/// with the native message. Implementations never retry.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns which family of store this is.
    fn kind(&self) -> BackendKind;

    /// Returns the native guarantees of this backend.
    fn capabilities(&self) -> BackendCapabilities;

    /// Allocates a fresh backend-native document reference without writing anything.
    fn allocate_id(&self) -> String;

    /// Returns the collection name that holds the documents of the logical
    /// collection whose native reference is `backend_ref`.
    fn data_space(&self, backend_ref: &str) -> String;

    /// Retrieves documents by id.
    ///
    /// Missing ids are omitted. Result order is not guaranteed to match `ids`.
    ///
    /// # Arguments
    ///
    /// * `ids` - The document ids to retrieve
    /// * `collection` - The collection to read from
    async fn get_documents(
        &self,
        ids: Vec<String>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<StoredDocument>>;

    /// Executes a native query.
    ///
    /// Predicates are combined with logical AND, sort keys are applied in
    /// order, then `start_after` or `skip`, then `limit`.
    ///
    /// # Arguments
    ///
    /// * `query` - The [`NativeQuery`] to run
    /// * `collection` - The collection to query. A missing collection yields no rows.
    async fn query_documents(
        &self,
        query: NativeQuery,
        collection: &str,
    ) -> DocumentStoreResult<Vec<StoredDocument>>;

    /// Counts the documents matching every predicate.
    async fn count_documents(
        &self,
        predicates: Vec<Predicate>,
        collection: &str,
    ) -> DocumentStoreResult<usize>;

    /// Lists the id of every document in a collection.
    async fn list_document_ids(&self, collection: &str) -> DocumentStoreResult<Vec<String>>;

    /// Commits a batch of writes.
    ///
    /// When [`BackendCapabilities::atomic_batches`] is advertised, either every
    /// write in the batch becomes visible or none does, and a failed batch
    /// leaves no partial state.
    ///
    /// # Errors
    ///
    /// - [`DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists) for an insert over an existing id
    /// - [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound) for an update of a missing id
    /// - [`Backend`](crate::error::DocumentStoreError::Backend) when the store rejects the batch
    async fn commit(&self, batch: WriteBatch) -> DocumentStoreResult<()>;

    /// Tears down the session and releases all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend + ?Sized,
{
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn capabilities(&self) -> BackendCapabilities {
        (**self).capabilities()
    }

    fn allocate_id(&self) -> String {
        (**self).allocate_id()
    }

    fn data_space(&self, backend_ref: &str) -> String {
        (**self).data_space(backend_ref)
    }

    async fn get_documents(
        &self,
        ids: Vec<String>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<StoredDocument>> {
        (**self)
            .get_documents(ids, collection)
            .await
    }

    async fn query_documents(
        &self,
        query: NativeQuery,
        collection: &str,
    ) -> DocumentStoreResult<Vec<StoredDocument>> {
        (**self)
            .query_documents(query, collection)
            .await
    }

    async fn count_documents(
        &self,
        predicates: Vec<Predicate>,
        collection: &str,
    ) -> DocumentStoreResult<usize> {
        (**self)
            .count_documents(predicates, collection)
            .await
    }

    async fn list_document_ids(&self, collection: &str) -> DocumentStoreResult<Vec<String>> {
        (**self).list_document_ids(collection).await
    }

    async fn commit(&self, batch: WriteBatch) -> DocumentStoreResult<()> {
        (**self).commit(batch).await
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        (**self).shutdown().await
    }
}

/// Connects to a store and yields a live backend session.
///
/// Builders validate their credentials before any connection attempt.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn batch_keeps_write_order() {
        let mut batch = WriteBatch::new();
        batch
            .insert("a", "1", doc! { "x": 1 })
            .update("a", "2", doc! { "x": 2 })
            .delete("b", "3");

        let targets = batch
            .ops()
            .iter()
            .map(|op| (op.collection(), op.id()))
            .collect::<Vec<_>>();

        assert_eq!(targets, vec![("a", "1"), ("a", "2"), ("b", "3")]);
        assert_eq!(batch.len(), 3);
    }
}
