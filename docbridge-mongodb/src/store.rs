//! MongoDB flat collection backend.
//!
//! Each logical collection maps to one MongoDB collection named
//! `data_{backend_ref}`. Document ids are ObjectId hex strings stored in
//! `_id`. Batches run inside a session transaction, which requires a replica
//! set or sharded cluster; deployments without one can turn transactions off,
//! in which case the backend stops advertising atomic batches.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, Bson, doc, oid::ObjectId};
use mongodb::{
    Client, ClientSession, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions},
};
use tracing::{debug, info, warn};

use docbridge_core::{
    backend::{BackendCapabilities, BackendKind, StoreBackend, StoreBackendBuilder, WriteBatch, WriteOp},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{NativeQuery, Predicate},
    record::{NATIVE_ID_FIELD, StoredDocument},
};

use crate::{
    query::{MongoQueryTranslator, sort_document},
    sanitizer::ValueSanitizer,
};

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
    transactions: bool,
    closed: Arc<AtomicBool>,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String, transactions: bool) -> Self {
        Self {
            client,
            database,
            transactions,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn builder(uri: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(uri, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&ValueSanitizer::sanitize_string(collection_name))
    }

    fn ensure_open(&self) -> DocumentStoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DocumentStoreError::NotConnected);
        }

        Ok(())
    }

    fn prepare_document(&self, id: &str, document: &Document) -> Document {
        let mut prepared = doc! { NATIVE_ID_FIELD: id };
        prepared.extend(ValueSanitizer::sanitize_document(document));
        prepared
    }

    fn restore_document(&self, mut document: Document) -> DocumentStoreResult<StoredDocument> {
        let id = match document.remove(NATIVE_ID_FIELD) {
            Some(Bson::String(id)) => id,
            Some(Bson::ObjectId(oid)) => oid.to_hex(),
            Some(other) => {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "unsupported _id type {:?}",
                    other.element_type()
                )));
            }
            None => return Err(DocumentStoreError::InvalidDocument("document has no _id".to_string())),
        };

        Ok(StoredDocument::new(id, ValueSanitizer::restore_document(&document)))
    }

    async fn find(&self, filter: Document, options: FindOptions, collection: &str) -> DocumentStoreResult<Vec<StoredDocument>> {
        self.get_collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
            .into_iter()
            .map(|doc| self.restore_document(doc))
            .collect()
    }

    /// Applies one write, inside `session` when given.
    async fn apply(&self, op: WriteOp, session: Option<&mut ClientSession>) -> DocumentStoreResult<()> {
        match op {
            WriteOp::Insert { collection, id, document } => {
                let target = self.get_collection(&collection);
                let action = target.insert_one(self.prepare_document(&id, &document));
                let result = match session {
                    Some(session) => action.session(session).await,
                    None => action.await,
                };

                result.map_err(|e| insert_error(&e, id, collection))?;
            }
            WriteOp::Update { collection, id, patch } => {
                let target = self.get_collection(&collection);
                let action = target.update_one(
                    doc! { NATIVE_ID_FIELD: id.as_str() },
                    doc! { "$set": ValueSanitizer::sanitize_document(&patch) },
                );
                let result = match session {
                    Some(session) => action.session(session).await,
                    None => action.await,
                }
                .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

                if result.matched_count == 0 {
                    return Err(DocumentStoreError::DocumentNotFound(id, collection));
                }
            }
            WriteOp::Delete { collection, id } => {
                let target = self.get_collection(&collection);
                let action = target.delete_one(doc! { NATIVE_ID_FIELD: id.as_str() });

                match session {
                    Some(session) => action.session(session).await,
                    None => action.await,
                }
                .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;
            }
        }

        Ok(())
    }

    async fn commit_in_transaction(&self, batch: WriteBatch) -> DocumentStoreResult<()> {
        let mut session = self
            .client
            .start_session()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        session
            .start_transaction()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        for op in batch.into_ops() {
            if let Err(err) = self.apply(op, Some(&mut session)).await {
                if let Err(abort) = session.abort_transaction().await {
                    warn!(error = %abort, "failed to abort transaction");
                }
                return Err(err);
            }
        }

        session
            .commit_transaction()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))
    }
}

/// Maps a failed insert: a unique index violation means the id is taken.
fn insert_error(err: &MongoError, id: String, collection: String) -> DocumentStoreError {
    if is_duplicate_key(err) {
        DocumentStoreError::DocumentAlreadyExists(id, collection)
    } else {
        DocumentStoreError::Backend(err.to_string())
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Flat
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            atomic_batches: self.transactions,
            cursor_resume: false,
            max_batch_writes: None,
        }
    }

    fn allocate_id(&self) -> String {
        ObjectId::new().to_hex()
    }

    fn data_space(&self, backend_ref: &str) -> String {
        format!("data_{}", backend_ref)
    }

    async fn get_documents(&self, ids: Vec<String>, collection: &str) -> DocumentStoreResult<Vec<StoredDocument>> {
        self.ensure_open()?;

        self.find(
            doc! { NATIVE_ID_FIELD: { "$in": ids } },
            FindOptions::default(),
            collection,
        )
        .await
    }

    async fn query_documents(&self, query: NativeQuery, collection: &str) -> DocumentStoreResult<Vec<StoredDocument>> {
        self.ensure_open()?;

        if query.start_after.is_some() {
            return Err(DocumentStoreError::Unsupported(
                "resume cursors are not supported by the MongoDB backend".to_string(),
            ));
        }

        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.skip {
            options.skip = Some(skip as u64);
        }
        options.sort = Some(sort_document(&query.order_by));

        self.find(MongoQueryTranslator::filter(&query.predicates)?, options, collection)
            .await
    }

    async fn count_documents(&self, predicates: Vec<Predicate>, collection: &str) -> DocumentStoreResult<usize> {
        self.ensure_open()?;

        let count = self
            .get_collection(collection)
            .count_documents(MongoQueryTranslator::filter(&predicates)?)
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        Ok(count as usize)
    }

    async fn list_document_ids(&self, collection: &str) -> DocumentStoreResult<Vec<String>> {
        self.ensure_open()?;

        let mut options = FindOptions::default();
        options.projection = Some(doc! { NATIVE_ID_FIELD: 1 });

        Ok(
            self.find(doc! {}, options, collection)
                .await?
                .into_iter()
                .map(|stored| stored.id)
                .collect()
        )
    }

    async fn commit(&self, batch: WriteBatch) -> DocumentStoreResult<()> {
        self.ensure_open()?;

        let writes = batch.len();

        if self.transactions {
            self.commit_in_transaction(batch).await?;
        } else {
            for op in batch.into_ops() {
                self.apply(op, None).await?;
            }
        }

        debug!(writes, transactional = self.transactions, "mongodb batch committed");

        Ok(())
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.client.clone().shutdown().await;
        info!(database = %self.database, "mongodb session closed");

        Ok(())
    }
}

/// Builder for [`MongoDbStore`]. Transactions are on by default.
#[derive(Debug)]
pub struct MongoDbStoreBuilder {
    uri: String,
    database: String,
    transactions: bool,
}

impl MongoDbStoreBuilder {
    pub fn new(uri: &str, database: &str) -> Self {
        Self {
            uri: uri.to_string(),
            database: database.to_string(),
            transactions: true,
        }
    }

    /// Runs batches in session transactions. Requires a replica set.
    pub fn transactions(mut self, transactions: bool) -> Self {
        self.transactions = transactions;
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        if self.uri.trim().is_empty() || self.database.trim().is_empty() {
            return Err(DocumentStoreError::InvalidCredentials(
                "a connection uri and a database name are required".to_string(),
            ));
        }

        let client = Client::with_options(
            ClientOptions::parse(&self.uri)
                .await
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
        )
        .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        info!(database = %self.database, transactions = self.transactions, "mongodb session opened");

        Ok(MongoDbStore::new(client, self.database, self.transactions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blank_credentials_are_rejected_before_connecting() {
        let result = MongoDbStore::builder("", "app").build().await;

        assert!(matches!(result, Err(DocumentStoreError::InvalidCredentials(_))));

        let result = MongoDbStore::builder("mongodb://localhost:27017", " ").build().await;

        assert!(matches!(result, Err(DocumentStoreError::InvalidCredentials(_))));
    }

    #[test]
    fn failed_insert_without_duplicate_key_is_a_backend_error() {
        let err = MongoError::from(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"));

        assert!(!is_duplicate_key(&err));
        assert!(matches!(
            insert_error(&err, "abc".into(), "data_x".into()),
            DocumentStoreError::Backend(message) if message.contains("reset")
        ));
    }

    #[tokio::test]
    async fn capabilities_follow_transaction_setting() {
        let store = MongoDbStore::builder("mongodb://localhost:27017", "app")
            .transactions(false)
            .build()
            .await
            .unwrap();

        assert!(!store.capabilities().atomic_batches);
        assert!(!store.capabilities().cursor_resume);
        assert_eq!(store.data_space("abc"), "data_abc");
        assert_eq!(store.allocate_id().len(), 24);
    }
}
