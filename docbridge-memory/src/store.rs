//! In-memory hierarchical document store.
//!
//! This module provides a backend that behaves like a path-addressed
//! document database: collections are named by paths, document ids are
//! 20-character auto ids, batches commit atomically up to a write limit, and
//! offsets are expressed as resume cursors.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use async_trait::async_trait;
use bson::Document;
use mea::rwlock::RwLock;
use rand::Rng;
use tracing::{debug, info};

use docbridge_core::{
    backend::{BackendCapabilities, BackendKind, StoreBackend, StoreBackendBuilder, WriteBatch, WriteOp},
    catalog::CATALOG_COLLECTION,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{NativeQuery, Predicate},
    record::StoredDocument,
};

use crate::evaluator::{DocumentEvaluator, compare_documents};

/// Writes accepted in one batch unless configured otherwise.
pub const DEFAULT_MAX_BATCH_WRITES: usize = 500;

/// Length of generated document ids.
pub const AUTO_ID_LENGTH: usize = 20;

const AUTO_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

type CollectionMap = BTreeMap<String, Document>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory hierarchical backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state;
/// clones share the same data and the same session. Once
/// [`shutdown`](StoreBackend::shutdown) is called on any clone, every call
/// fails with [`DocumentStoreError::NotConnected`].
///
/// # Performance
///
/// Queries scan every document of a collection; there is no indexing.
///
/// # Example
///
/// ```ignore
/// use docbridge_memory::InMemoryStore;
/// use docbridge::backend::{StoreBackend, StoreBackendBuilder, WriteBatch};
/// use bson::doc;
///
/// let store = InMemoryStore::builder().build().await?;
///
/// let id = store.allocate_id();
/// let mut batch = WriteBatch::new();
/// batch.insert("users", id.clone(), doc! { "name": "Alice" });
/// store.commit(batch).await?;
///
/// assert_eq!(store.get_documents(vec![id], "users").await?.len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    /// collection path -> (document id -> document), ids kept in order
    store: Arc<RwLock<StoreMap>>,
    closed: Arc<AtomicBool>,
    max_batch_writes: usize,
}

impl InMemoryStore {
    /// Creates an empty store with the default batch limit.
    pub fn new() -> Self {
        Self::with_max_batch_writes(DEFAULT_MAX_BATCH_WRITES)
    }

    fn with_max_batch_writes(max_batch_writes: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
            closed: Arc::new(AtomicBool::new(false)),
            max_batch_writes,
        }
    }

    /// Creates a builder for constructing an `InMemoryStore` with custom options.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    fn ensure_open(&self) -> DocumentStoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DocumentStoreError::NotConnected);
        }

        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Hierarchical
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            atomic_batches: true,
            cursor_resume: true,
            max_batch_writes: Some(self.max_batch_writes),
        }
    }

    fn allocate_id(&self) -> String {
        let mut rng = rand::rng();

        (0..AUTO_ID_LENGTH)
            .map(|_| AUTO_ID_ALPHABET[rng.random_range(0..AUTO_ID_ALPHABET.len())] as char)
            .collect()
    }

    fn data_space(&self, backend_ref: &str) -> String {
        format!("{}/{}/documents", CATALOG_COLLECTION, backend_ref)
    }

    async fn get_documents(&self, ids: Vec<String>, collection: &str) -> DocumentStoreResult<Vec<StoredDocument>> {
        self.ensure_open()?;

        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        Ok(
            ids
                .into_iter()
                .filter_map(|id| {
                    collection_map
                        .get(&id)
                        .map(|doc| StoredDocument::new(id, doc.clone()))
                })
                .collect()
        )
    }

    async fn query_documents(&self, query: NativeQuery, collection: &str) -> DocumentStoreResult<Vec<StoredDocument>> {
        self.ensure_open()?;

        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut rows = collection_map
            .iter()
            .filter(|(_, doc)| DocumentEvaluator::matches(doc, &query.predicates))
            .map(|(id, doc)| StoredDocument::new(id.clone(), doc.clone()))
            .collect::<Vec<_>>();

        rows.sort_by(|a, b| compare_documents(a, b, &query.order_by));

        let start = match &query.start_after {
            Some(cursor) => rows.partition_point(|row| {
                compare_documents(row, cursor, &query.order_by) != std::cmp::Ordering::Greater
            }),
            None => 0,
        };

        Ok(
            rows
                .into_iter()
                .skip(start)
                .skip(query.skip.unwrap_or(0))
                .take(query.limit.unwrap_or(usize::MAX))
                .collect()
        )
    }

    async fn count_documents(&self, predicates: Vec<Predicate>, collection: &str) -> DocumentStoreResult<usize> {
        self.ensure_open()?;

        Ok(
            self.store
                .read()
                .await
                .get(collection)
                .map(|col| {
                    col
                        .values()
                        .filter(|doc| DocumentEvaluator::matches(doc, &predicates))
                        .count()
                })
                .unwrap_or(0)
        )
    }

    async fn list_document_ids(&self, collection: &str) -> DocumentStoreResult<Vec<String>> {
        self.ensure_open()?;

        Ok(
            self.store
                .read()
                .await
                .get(collection)
                .map(|col| col.keys().cloned().collect())
                .unwrap_or_default()
        )
    }

    /// Validates the whole batch against a staged view, then applies it under
    /// one write lock. A rejected batch changes nothing.
    async fn commit(&self, batch: WriteBatch) -> DocumentStoreResult<()> {
        self.ensure_open()?;

        if batch.len() > self.max_batch_writes {
            return Err(DocumentStoreError::Backend(format!(
                "batch of {} writes exceeds the limit of {}",
                batch.len(),
                self.max_batch_writes
            )));
        }

        let writes = batch.len();
        let mut store = self.store.write().await;
        let mut staged: Vec<((String, String), Option<Document>)> = Vec::with_capacity(writes);

        for op in batch.into_ops() {
            let current = staged
                .iter()
                .rev()
                .find(|((col, id), _)| col == op.collection() && id == op.id())
                .map(|(_, doc)| doc.clone())
                .unwrap_or_else(|| {
                    store
                        .get(op.collection())
                        .and_then(|col| col.get(op.id()))
                        .cloned()
                });

            match op {
                WriteOp::Insert { collection, id, document } => {
                    if current.is_some() {
                        return Err(DocumentStoreError::DocumentAlreadyExists(id, collection));
                    }
                    staged.push(((collection, id), Some(document)));
                }
                WriteOp::Update { collection, id, patch } => {
                    let Some(mut merged) = current else {
                        return Err(DocumentStoreError::DocumentNotFound(id, collection));
                    };
                    merged.extend(patch);
                    staged.push(((collection, id), Some(merged)));
                }
                WriteOp::Delete { collection, id } => {
                    staged.push(((collection, id), None));
                }
            }
        }

        for ((collection, id), document) in staged {
            match document {
                Some(document) => {
                    store
                        .entry(collection)
                        .or_default()
                        .insert(id, document);
                }
                None => {
                    if let Some(col) = store.get_mut(&collection) {
                        col.remove(&id);
                        if col.is_empty() {
                            store.remove(&collection);
                        }
                    }
                }
            }
        }

        debug!(writes, "in-memory batch applied");

        Ok(())
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.closed.store(true, Ordering::Release);
        info!("in-memory store closed");

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docbridge_memory::InMemoryStore;
/// use docbridge::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder()
///     .project_id("demo")
///     .max_batch_writes(100)
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder {
    project_id: Option<String>,
    max_batch_writes: Option<usize>,
}

impl InMemoryStoreBuilder {
    /// Sets the project the session is opened for. Only used in diagnostics.
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Sets the largest batch the store accepts.
    pub fn max_batch_writes(mut self, max_batch_writes: usize) -> Self {
        self.max_batch_writes = Some(max_batch_writes);
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new, empty [`InMemoryStore`].
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] if the batch limit is zero.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let max_batch_writes = self.max_batch_writes.unwrap_or(DEFAULT_MAX_BATCH_WRITES);
        if max_batch_writes == 0 {
            return Err(DocumentStoreError::Initialization(
                "max_batch_writes must be at least 1".to_string(),
            ));
        }

        info!(
            project = self.project_id.as_deref().unwrap_or("default"),
            max_batch_writes,
            "in-memory store opened"
        );

        Ok(InMemoryStore::with_max_batch_writes(max_batch_writes))
    }
}
