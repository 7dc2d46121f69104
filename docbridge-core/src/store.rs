//! Single-document CRUD against a named collection.
//!
//! # Example
//!
//! ```ignore
//! use docbridge::store::DocumentStore;
//! use bson::doc;
//!
//! let store = DocumentStore::new(&backend);
//! let created = store.create("posts", doc! { "title": "Hello" }).await?;
//! let fetched = store.get("posts", &created.id).await?;
//! assert_eq!(fetched, Some(created));
//! ```

use bson::DateTime;
use tracing::debug;

use crate::{
    backend::{StoreBackend, WriteBatch},
    batch::commit,
    error::{DocumentStoreError, DocumentStoreResult},
    record::{Fields, Record, UPDATED_AT_FIELD, next_timestamp, strip_reserved},
};

/// Document CRUD over one backend.
///
/// The store stamps `createdAt` and `updatedAt`; caller payloads never set
/// them, nor the identity.
#[derive(Debug)]
pub struct DocumentStore<'a, B: StoreBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: StoreBackend + ?Sized> DocumentStore<'a, B> {
    /// Creates a document store over the given backend.
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Fetches a document by id, returning `None` when it does not exist.
    pub async fn get(&self, collection: &str, id: &str) -> DocumentStoreResult<Option<Record>> {
        self.backend
            .get_documents(vec![id.to_string()], collection)
            .await?
            .into_iter()
            .find(|stored| stored.id == id)
            .map(|stored| stored.into_record())
            .transpose()
    }

    /// Creates a document with a backend-allocated id.
    ///
    /// `createdAt` and `updatedAt` are both set to the current time.
    pub async fn create(&self, collection: &str, fields: Fields) -> DocumentStoreResult<Record> {
        let now = DateTime::now();
        let record = Record::new(self.backend.allocate_id(), fields, now, now);

        let mut batch = WriteBatch::new();
        batch.insert(collection, record.id.clone(), record.to_stored());
        commit(self.backend, batch).await?;

        debug!(collection, id = %record.id, "document created");

        Ok(record)
    }

    /// Merges `fields` over an existing document and re-stamps `updatedAt`.
    ///
    /// Identity and timestamp keys in `fields` are ignored. The returned
    /// record is read back from the backend after the write.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] if `id` does not resolve.
    pub async fn update(&self, collection: &str, id: &str, fields: Fields) -> DocumentStoreResult<Record> {
        let existing = self
            .get(collection, id)
            .await?
            .ok_or_else(|| not_found(collection, id))?;

        let mut patch = strip_reserved(fields);
        patch.insert(UPDATED_AT_FIELD, next_timestamp(existing.updated_at));

        let mut batch = WriteBatch::new();
        batch.update(collection, id, patch);
        commit(self.backend, batch).await?;

        debug!(collection, id, "document updated");

        self.get(collection, id)
            .await?
            .ok_or_else(|| not_found(collection, id))
    }

    /// Deletes a document. Deleting a missing id succeeds.
    pub async fn delete(&self, collection: &str, id: &str) -> DocumentStoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, id);
        commit(self.backend, batch).await?;

        debug!(collection, id, "document deleted");

        Ok(())
    }
}

fn not_found(collection: &str, id: &str) -> DocumentStoreError {
    DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string())
}
