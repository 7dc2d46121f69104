//! Multi-document writes committed as one atomic unit.
//!
//! The batch engine assigns identities and one shared timestamp to every item
//! before submission, so the full document shape is known without waiting on
//! backend responses and every document in a batch carries the same stamp.

use bson::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::{
    backend::{StoreBackend, WriteBatch},
    error::{DocumentStoreError, DocumentStoreResult},
    record::{Fields, Record, UPDATED_AT_FIELD, next_timestamp, strip_reserved},
};

/// One item of [`BatchEngine::update_many`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpdate {
    pub id: String,
    pub fields: Fields,
}

impl DocumentUpdate {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self { id: id.into(), fields }
    }
}

/// Batch document operations over one backend.
#[derive(Debug)]
pub struct BatchEngine<'a, B: StoreBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: StoreBackend + ?Sized> BatchEngine<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Creates every item in one atomic write.
    ///
    /// The returned records are in input order. If the backend rejects the
    /// batch, nothing from it is visible.
    pub async fn create_many(&self, collection: &str, items: Vec<Fields>) -> DocumentStoreResult<Vec<Record>> {
        self.create_many_at(collection, items, DateTime::now())
            .await
    }

    /// Like [`create_many`](Self::create_many) with an explicit shared timestamp.
    pub async fn create_many_at(
        &self,
        collection: &str,
        items: Vec<Fields>,
        timestamp: DateTime,
    ) -> DocumentStoreResult<Vec<Record>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let records = items
            .into_iter()
            .map(|fields| Record::new(self.backend.allocate_id(), fields, timestamp, timestamp))
            .collect::<Vec<_>>();

        let mut batch = WriteBatch::new();
        for record in &records {
            batch.insert(collection, record.id.clone(), record.to_stored());
        }

        commit(self.backend, batch).await?;

        Ok(records)
    }

    /// Merges each update over its existing document in one atomic write.
    ///
    /// Every id is checked before anything is submitted, so a single unknown id
    /// fails the whole batch with [`DocumentStoreError::DocumentNotFound`] on
    /// every backend. The returned records are read back after the commit, in
    /// input order.
    pub async fn update_many(
        &self,
        collection: &str,
        updates: Vec<DocumentUpdate>,
    ) -> DocumentStoreResult<Vec<Record>> {
        if updates.is_empty() {
            return Ok(Vec::new());
        }

        let ids = updates
            .iter()
            .map(|update| update.id.clone())
            .collect::<Vec<_>>();
        let existing = self.fetch(ids.clone(), collection).await?;

        if let Some(missing) = ids.iter().find(|id| !existing.contains_key(*id)) {
            return Err(DocumentStoreError::DocumentNotFound(missing.clone(), collection.to_string()));
        }

        let latest = existing
            .values()
            .map(|record| record.updated_at)
            .max()
            .unwrap_or_else(DateTime::now);
        let timestamp = next_timestamp(latest);

        let mut batch = WriteBatch::new();
        for update in updates {
            let mut patch = strip_reserved(update.fields);
            patch.insert(UPDATED_AT_FIELD, timestamp);
            batch.update(collection, update.id, patch);
        }

        commit(self.backend, batch).await?;

        let mut stored = self.fetch(ids.clone(), collection).await?;
        ids.into_iter()
            .map(|id| {
                stored
                    .remove(&id)
                    .ok_or_else(|| DocumentStoreError::DocumentNotFound(id, collection.to_string()))
            })
            .collect()
    }

    /// Deletes every id in one atomic write. Unknown ids are skipped.
    pub async fn delete_many(&self, collection: &str, ids: Vec<String>) -> DocumentStoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut batch = WriteBatch::new();
        for id in ids {
            batch.delete(collection, id);
        }

        commit(self.backend, batch).await
    }

    async fn fetch(&self, ids: Vec<String>, collection: &str) -> DocumentStoreResult<HashMap<String, Record>> {
        self.backend
            .get_documents(ids, collection)
            .await?
            .into_iter()
            .map(|stored| stored.into_record().map(|record| (record.id.clone(), record)))
            .collect()
    }
}

/// Submits a batch, refusing multi-write batches on backends that cannot
/// commit them atomically.
pub(crate) async fn commit<B: StoreBackend + ?Sized>(backend: &B, batch: WriteBatch) -> DocumentStoreResult<()> {
    if batch.len() > 1 && !backend.capabilities().atomic_batches {
        warn!(
            backend = ?backend.kind(),
            writes = batch.len(),
            "refusing multi-write batch on a backend without atomic batches"
        );
        return Err(DocumentStoreError::Unsupported(format!(
            "backend cannot commit {} writes atomically",
            batch.len()
        )));
    }

    let writes = batch.len();
    debug!(writes, "committing batch");

    backend
        .commit(batch)
        .await
        .inspect_err(|err| warn!(writes, error = %err, "batch rejected"))
}
