//! The service facade.
//!
//! [`DataService`] owns one backend session and exposes collection, document,
//! batch, query and search operations over it, plus pass-throughs to the blob
//! and quota collaborators. Every data operation resolves the logical
//! collection through the catalog and runs against that collection's data
//! space.
//!
//! # Example
//!
//! ```ignore
//! use docbridge::prelude::*;
//! use bson::doc;
//!
//! let service = DataService::new(ServiceConfig::hierarchical("api-key", "project"));
//! service.connect().await?;
//!
//! let posts = service.create_collection(NewCollection::new("Posts"), Vec::new()).await?;
//! let created = service.create_document(&posts.id, doc! { "title": "Hello" }).await?;
//!
//! service.disconnect().await?;
//! ```

use mea::mutex::Mutex;
use std::{fmt, sync::Arc};
use tracing::{debug, info};

use docbridge_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    batch::{BatchEngine, DocumentUpdate},
    catalog::{Catalog, CollectionDefinition, CollectionPatch, CreateLock, NewCollection},
    error::{DocumentStoreError, DocumentStoreResult},
    page::{Page, PaginationParams},
    query::QuerySpec,
    record::{Fields, Record},
    search::SearchEngine,
    store::DocumentStore,
    translate::QueryTranslator,
};
use docbridge_memory::InMemoryStore;

use crate::{
    config::{BackendConfig, ServiceConfig},
    external::{BlobInfo, BlobKind, BlobStorage, BlobUpload, Feasibility, OperationType, QuotaGuard, UsageStats},
};

type Session = Arc<dyn StoreBackend>;

/// Provider-agnostic data service over one backend session.
pub struct DataService {
    config: ServiceConfig,
    /// The live session. Also the single-flight guard for connect.
    session: Mutex<Option<Session>>,
    create_lock: CreateLock,
    blobs: Option<Arc<dyn BlobStorage>>,
    quota: Option<Arc<dyn QuotaGuard>>,
}

impl fmt::Debug for DataService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataService")
            .field("config", &self.config)
            .field("blobs", &self.blobs)
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}

impl DataService {
    /// Creates a disconnected service.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
            create_lock: CreateLock::default(),
            blobs: None,
            quota: None,
        }
    }

    /// Attaches the blob storage collaborator.
    pub fn with_blob_storage(mut self, blobs: Arc<dyn BlobStorage>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Attaches the quota collaborator.
    pub fn with_quota_guard(mut self, quota: Arc<dyn QuotaGuard>) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Opens the backend session.
    ///
    /// Credentials are validated before any connection attempt. Concurrent
    /// callers wait for the attempt in flight; once a session exists every
    /// further call returns immediately without reconnecting. A failed attempt
    /// leaves the service disconnected, so a later call tries again.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::InvalidCredentials`] if a required credential field is blank
    /// - [`DocumentStoreError::Initialization`] if the backend cannot be set up
    /// - [`DocumentStoreError::Unsupported`] if the backend was compiled out
    pub async fn connect(&self) -> DocumentStoreResult<()> {
        let mut session = self.session.lock().await;

        if session.is_some() {
            debug!("already connected");
            return Ok(());
        }

        let backend = open_backend(&self.config.backend).await?;
        info!(backend = ?backend.kind(), "connected");
        *session = Some(backend);

        Ok(())
    }

    /// Tears down the session. Disconnecting a disconnected service succeeds.
    ///
    /// Operations that already hold the session see it closed and fail with
    /// [`DocumentStoreError::NotConnected`].
    pub async fn disconnect(&self) -> DocumentStoreResult<()> {
        let session = self.session.lock().await.take();

        if let Some(backend) = session {
            backend.shutdown().await?;
            info!(backend = ?backend.kind(), "disconnected");
        }

        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    async fn backend(&self) -> DocumentStoreResult<Session> {
        self.session
            .lock()
            .await
            .clone()
            .ok_or(DocumentStoreError::NotConnected)
    }

    async fn data_space(&self, backend: &Session, collection_id: &str) -> DocumentStoreResult<String> {
        let definition = Catalog::new(backend, &self.create_lock)
            .get(collection_id)
            .await?;

        Ok(backend.data_space(&definition.backend_ref))
    }

    /// Resolves a collection definition by logical id.
    pub async fn get_collection(&self, collection_id: &str) -> DocumentStoreResult<CollectionDefinition> {
        let backend = self.backend().await?;

        Catalog::new(&backend, &self.create_lock)
            .get(collection_id)
            .await
    }

    /// Lists every collection definition.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<CollectionDefinition>> {
        let backend = self.backend().await?;

        Catalog::new(&backend, &self.create_lock).list_all().await
    }

    /// Returns the definitions matching `names`; unknown names are skipped.
    pub async fn get_collections<S: AsRef<str>>(&self, names: &[S]) -> DocumentStoreResult<Vec<CollectionDefinition>> {
        let backend = self.backend().await?;

        Catalog::new(&backend, &self.create_lock)
            .get_many(names)
            .await
    }

    /// Creates a collection, or returns the existing one with the same name.
    /// See [`Catalog::create`].
    pub async fn create_collection(
        &self,
        new: NewCollection,
        seed: Vec<Fields>,
    ) -> DocumentStoreResult<CollectionDefinition> {
        let backend = self.backend().await?;

        Catalog::new(&backend, &self.create_lock)
            .create(new, seed)
            .await
    }

    pub async fn update_collection(
        &self,
        collection_id: &str,
        patch: CollectionPatch,
    ) -> DocumentStoreResult<CollectionDefinition> {
        let backend = self.backend().await?;

        Catalog::new(&backend, &self.create_lock)
            .update(collection_id, patch)
            .await
    }

    /// Deletes a collection together with all its documents.
    ///
    /// The documents and the definition go in one atomic batch, so the
    /// backend's batch write limit caps the collection size that can be
    /// deleted. On the hierarchical store that is fewer than
    /// [`DEFAULT_MAX_BATCH_WRITES`](docbridge_memory::DEFAULT_MAX_BATCH_WRITES)
    /// documents unless configured otherwise.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::CollectionNotFound`] if `collection_id` does not resolve
    /// - [`DocumentStoreError::Backend`] if the batch exceeds the limit; nothing is deleted
    pub async fn delete_collection(&self, collection_id: &str) -> DocumentStoreResult<()> {
        let backend = self.backend().await?;

        Catalog::new(&backend, &self.create_lock)
            .delete(collection_id)
            .await
    }

    pub async fn get_document(&self, collection_id: &str, document_id: &str) -> DocumentStoreResult<Option<Record>> {
        let backend = self.backend().await?;
        let space = self.data_space(&backend, collection_id).await?;

        DocumentStore::new(&backend).get(&space, document_id).await
    }

    pub async fn create_document(&self, collection_id: &str, fields: Fields) -> DocumentStoreResult<Record> {
        let backend = self.backend().await?;
        let space = self.data_space(&backend, collection_id).await?;

        DocumentStore::new(&backend).create(&space, fields).await
    }

    pub async fn update_document(
        &self,
        collection_id: &str,
        document_id: &str,
        fields: Fields,
    ) -> DocumentStoreResult<Record> {
        let backend = self.backend().await?;
        let space = self.data_space(&backend, collection_id).await?;

        DocumentStore::new(&backend)
            .update(&space, document_id, fields)
            .await
    }

    pub async fn delete_document(&self, collection_id: &str, document_id: &str) -> DocumentStoreResult<()> {
        let backend = self.backend().await?;
        let space = self.data_space(&backend, collection_id).await?;

        DocumentStore::new(&backend).delete(&space, document_id).await
    }

    /// Creates every item in one atomic batch.
    pub async fn batch_create(&self, collection_id: &str, items: Vec<Fields>) -> DocumentStoreResult<Vec<Record>> {
        let backend = self.backend().await?;
        let space = self.data_space(&backend, collection_id).await?;

        BatchEngine::new(&backend).create_many(&space, items).await
    }

    /// Applies every update in one atomic batch.
    pub async fn batch_update(
        &self,
        collection_id: &str,
        updates: Vec<DocumentUpdate>,
    ) -> DocumentStoreResult<Vec<Record>> {
        let backend = self.backend().await?;
        let space = self.data_space(&backend, collection_id).await?;

        BatchEngine::new(&backend).update_many(&space, updates).await
    }

    /// Deletes every id in one atomic batch.
    pub async fn batch_delete(&self, collection_id: &str, document_ids: Vec<String>) -> DocumentStoreResult<()> {
        let backend = self.backend().await?;
        let space = self.data_space(&backend, collection_id).await?;

        BatchEngine::new(&backend)
            .delete_many(&space, document_ids)
            .await
    }

    pub async fn query_documents(&self, collection_id: &str, query: &QuerySpec) -> DocumentStoreResult<Page<Record>> {
        let backend = self.backend().await?;
        let space = self.data_space(&backend, collection_id).await?;

        QueryTranslator::new(&backend).execute(&space, query).await
    }

    /// Prefix search over `fields`. See [`SearchEngine::search`].
    pub async fn search_documents<S: AsRef<str>>(
        &self,
        collection_id: &str,
        text: &str,
        fields: &[S],
        params: PaginationParams,
    ) -> DocumentStoreResult<Page<Record>> {
        let backend = self.backend().await?;
        let space = self.data_space(&backend, collection_id).await?;

        SearchEngine::new(&backend)
            .search(&space, text, fields, params)
            .await
    }

    fn blobs(&self) -> DocumentStoreResult<&Arc<dyn BlobStorage>> {
        self.blobs
            .as_ref()
            .ok_or_else(|| DocumentStoreError::Unsupported("no blob storage is configured".to_string()))
    }

    pub async fn upload_image(&self, upload: BlobUpload) -> DocumentStoreResult<BlobInfo> {
        self.blobs()?.upload(BlobKind::Image, upload).await
    }

    pub async fn upload_file(&self, upload: BlobUpload) -> DocumentStoreResult<BlobInfo> {
        self.blobs()?.upload(BlobKind::File, upload).await
    }

    pub async fn get_blob(&self, blob_id: &str) -> DocumentStoreResult<Option<BlobInfo>> {
        self.blobs()?.get(blob_id).await
    }

    pub async fn update_blob(&self, blob_id: &str, upload: BlobUpload) -> DocumentStoreResult<BlobInfo> {
        self.blobs()?.update(blob_id, upload).await
    }

    pub async fn delete_blob(&self, blob_id: &str) -> DocumentStoreResult<()> {
        self.blobs()?.delete(blob_id).await
    }

    pub async fn list_blobs(&self, kind: Option<BlobKind>) -> DocumentStoreResult<Vec<BlobInfo>> {
        self.blobs()?.list(kind).await
    }

    /// Asks the quota collaborator whether an operation fits the plan.
    ///
    /// Advisory only: nothing in the service calls this on its own. Without a
    /// quota collaborator every operation is feasible.
    pub async fn check_operation_feasibility(
        &self,
        operation: OperationType,
        size: Option<u64>,
        target: &str,
    ) -> DocumentStoreResult<Feasibility> {
        match &self.quota {
            Some(quota) => quota.check_operation_feasibility(operation, size, target).await,
            None => Ok(Feasibility::allowed()),
        }
    }

    /// Returns usage statistics, empty without a quota collaborator.
    pub async fn usage_stats(&self) -> DocumentStoreResult<UsageStats> {
        match &self.quota {
            Some(quota) => quota.usage_stats().await,
            None => Ok(UsageStats::default()),
        }
    }
}

/// Validates credentials and opens a session for `config`.
async fn open_backend(config: &BackendConfig) -> DocumentStoreResult<Session> {
    config.validate()?;

    match config {
        BackendConfig::Hierarchical(config) => {
            let mut builder = InMemoryStore::builder().project_id(&config.project_id);
            if let Some(max_batch_writes) = config.max_batch_writes {
                builder = builder.max_batch_writes(max_batch_writes);
            }

            Ok(Arc::new(builder.build().await?))
        }
        #[cfg(feature = "mongodb")]
        BackendConfig::Flat(config) => Ok(Arc::new(
            docbridge_mongodb::MongoDbStore::builder(&config.uri, &config.database)
                .transactions(config.transactions)
                .build()
                .await?,
        )),
        #[cfg(not(feature = "mongodb"))]
        BackendConfig::Flat(_) => Err(DocumentStoreError::Unsupported(
            "the flat backend requires the `mongodb` feature".to_string(),
        )),
    }
}
