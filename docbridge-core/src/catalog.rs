//! The registry of logical collections.
//!
//! Every logical collection is described by a [`CollectionDefinition`] stored
//! in the reserved backend collection [`CATALOG_COLLECTION`]. A definition's
//! native id is its `backend_ref`; its documents live in the backend's data
//! space for that reference (see [`StoreBackend::data_space`]).
//!
//! Names are unique after trimming and lowercasing, and
//! [`create`](Catalog::create) is idempotent by name.
//!
//! # Example
//!
//! ```ignore
//! use docbridge::catalog::{Catalog, CreateLock, FieldDefinition, FieldType, NewCollection};
//!
//! let lock = CreateLock::default();
//! let catalog = Catalog::new(&backend, &lock);
//!
//! let posts = catalog
//!     .create(
//!         NewCollection::new("Posts").field(FieldDefinition::new("title", FieldType::Text).searchable()),
//!         Vec::new(),
//!     )
//!     .await?;
//!
//! assert_eq!(posts.name, "posts");
//! ```

use bson::{Bson, DateTime as BsonDateTime, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use chrono::{DateTime, Utc};
use mea::mutex::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::{
    backend::{StoreBackend, WriteBatch},
    batch::{BatchEngine, commit},
    error::{DocumentStoreError, DocumentStoreResult},
    id::{new_id_from, normalize_name, slugify},
    query::{FieldOp, NativeQuery, Predicate},
    record::{Fields, StoredDocument, next_timestamp},
};

/// Reserved backend collection holding every [`CollectionDefinition`].
pub const CATALOG_COLLECTION: &str = "_collections";

/// Value types a collection field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Text,
    RichText,
    Number,
    Boolean,
    Date,
    Email,
    Url,
    Select,
    Image,
    File,
    Relation,
    Json,
}

/// The declared shape of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Type-specific settings, such as the options of a select field.
    #[serde(default)]
    pub settings: Document,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Bson>,
    #[serde(default)]
    pub is_searchable: bool,
    #[serde(default)]
    pub is_sortable: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            settings: Document::new(),
            default_value: None,
            is_searchable: false,
            is_sortable: false,
        }
    }

    /// Marks the field as a search target.
    pub fn searchable(mut self) -> Self {
        self.is_searchable = true;
        self
    }

    /// Marks the field as usable in sort keys.
    pub fn sortable(mut self) -> Self {
        self.is_sortable = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Bson>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_settings(mut self, settings: Document) -> Self {
        self.settings = settings;
        self
    }
}

/// Who may read a collection's documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

/// Collection-wide behavior flags. Stored and returned; not enforced here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionSettings {
    pub visibility: Visibility,
    pub soft_delete: bool,
    pub versioning: bool,
    pub hooks: Vec<String>,
}

/// A declared index. Recorded in the definition only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    pub fields: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

/// Metadata describing one logical collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDefinition {
    /// Logical id, derived from the name at creation and never changed.
    pub id: String,
    /// Native reference of the definition record; keys the data space.
    pub backend_ref: String,
    /// Normalized (trimmed, lowercased) unique name.
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    pub timestamps: bool,
    #[serde(default)]
    pub settings: CollectionSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Vec<IndexDefinition>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CollectionDefinition {
    /// Looks up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Names of the fields flagged searchable, in declaration order.
    pub fn searchable_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|field| field.is_searchable)
            .map(|field| field.name.clone())
            .collect()
    }

    /// Names of the fields flagged sortable, in declaration order.
    pub fn sortable_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|field| field.is_sortable)
            .map(|field| field.name.clone())
            .collect()
    }

    fn to_document(&self) -> DocumentStoreResult<Document> {
        match serialize_to_bson(self)? {
            Bson::Document(document) => Ok(document),
            other => Err(DocumentStoreError::Serialization(format!(
                "collection definition serialized to {:?}",
                other.element_type()
            ))),
        }
    }

    fn from_stored(stored: StoredDocument) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(stored.document))?)
    }
}

/// Input to [`Catalog::create`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollection {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default = "default_timestamps")]
    pub timestamps: bool,
    #[serde(default)]
    pub settings: CollectionSettings,
    #[serde(default)]
    pub indexes: Option<Vec<IndexDefinition>>,
}

fn default_timestamps() -> bool {
    true
}

impl NewCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
            timestamps: true,
            settings: CollectionSettings::default(),
            indexes: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a field declaration.
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn settings(mut self, settings: CollectionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Appends an index declaration.
    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.get_or_insert_with(Vec::new).push(index);
        self
    }
}

/// Partial update for [`Catalog::update`]. Absent members are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub fields: Option<Vec<FieldDefinition>>,
    pub timestamps: Option<bool>,
    pub settings: Option<CollectionSettings>,
    pub indexes: Option<Vec<IndexDefinition>>,
}

/// Serializes collection creation within one process.
///
/// Share one lock between every [`Catalog`] handle over the same backend.
pub struct CreateLock(Mutex<()>);

impl Default for CreateLock {
    fn default() -> Self {
        Self(Mutex::new(()))
    }
}

impl std::fmt::Debug for CreateLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateLock").finish_non_exhaustive()
    }
}

/// Catalog operations over one backend.
#[derive(Debug)]
pub struct Catalog<'a, B: StoreBackend + ?Sized> {
    backend: &'a B,
    create_lock: &'a CreateLock,
}

impl<'a, B: StoreBackend + ?Sized> Catalog<'a, B> {
    pub fn new(backend: &'a B, create_lock: &'a CreateLock) -> Self {
        Self { backend, create_lock }
    }

    /// Returns the backend collection holding the documents of `definition`.
    pub fn data_space(&self, definition: &CollectionDefinition) -> String {
        self.backend.data_space(&definition.backend_ref)
    }

    /// Creates a collection, or returns the existing one with the same
    /// normalized name.
    ///
    /// When the collection is new and `seed` is not empty, the seed documents
    /// are written through the batch engine after the definition is durable,
    /// all stamped with the definition's `createdAt`. An existing collection is
    /// returned as is and `seed` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] for a blank name. A
    /// failed seed batch is returned as is; the definition stays durable.
    pub async fn create(&self, new: NewCollection, seed: Vec<Fields>) -> DocumentStoreResult<CollectionDefinition> {
        let name = normalize_name(&new.name);
        if name.is_empty() {
            return Err(DocumentStoreError::InvalidDocument(
                "collection name must not be blank".to_string(),
            ));
        }

        let guard = self.create_lock.0.lock().await;

        if let Some(existing) = self.find_by_name(&name).await? {
            debug!(collection = %existing.id, "collection already exists");
            return Ok(existing);
        }

        let stamp = BsonDateTime::now();
        let now = stamp.to_chrono();
        let definition = CollectionDefinition {
            id: new_id_from(&name),
            backend_ref: self.backend.allocate_id(),
            slug: slugify(&name),
            name,
            description: new.description,
            fields: new.fields,
            timestamps: new.timestamps,
            settings: new.settings,
            indexes: new.indexes,
            created_at: now,
            updated_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.insert(CATALOG_COLLECTION, definition.backend_ref.clone(), definition.to_document()?);
        commit(self.backend, batch).await?;

        drop(guard);

        info!(
            collection = %definition.id,
            backend_ref = %definition.backend_ref,
            name = %definition.name,
            "collection created"
        );

        if !seed.is_empty() {
            let count = seed.len();
            BatchEngine::new(self.backend)
                .create_many_at(&self.data_space(&definition), seed, stamp)
                .await?;
            debug!(collection = %definition.id, count, "collection seeded");
        }

        Ok(definition)
    }

    /// Resolves a definition by logical id.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::CollectionNotFound`] if no definition has this id.
    pub async fn get(&self, logical_id: &str) -> DocumentStoreResult<CollectionDefinition> {
        self.find_one(Predicate::new("id", FieldOp::Eq, logical_id))
            .await?
            .ok_or_else(|| DocumentStoreError::CollectionNotFound(logical_id.to_string()))
    }

    /// Returns the definitions whose normalized name is among `names`.
    ///
    /// Unknown names are skipped, so the result may hold fewer items than requested.
    pub async fn get_many<S: AsRef<str>>(&self, names: &[S]) -> DocumentStoreResult<Vec<CollectionDefinition>> {
        let wanted = names
            .iter()
            .map(|name| normalize_name(name.as_ref()))
            .collect::<HashSet<_>>();

        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|definition| wanted.contains(&definition.name))
            .collect())
    }

    /// Returns every definition, oldest first.
    pub async fn list_all(&self) -> DocumentStoreResult<Vec<CollectionDefinition>> {
        let mut definitions = self
            .backend
            .query_documents(NativeQuery::default(), CATALOG_COLLECTION)
            .await?
            .into_iter()
            .map(CollectionDefinition::from_stored)
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        definitions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));

        Ok(definitions)
    }

    /// Applies a partial update and returns the new definition.
    ///
    /// A changed name is normalized and the slug recomputed. The logical id and
    /// backend reference never change. Renames are serialized with
    /// [`create`](Self::create) through the shared [`CreateLock`].
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::CollectionNotFound`] if `logical_id` does not resolve
    /// - [`DocumentStoreError::CollectionAlreadyExists`] if the new name belongs to another collection
    pub async fn update(&self, logical_id: &str, patch: CollectionPatch) -> DocumentStoreResult<CollectionDefinition> {
        // Held across the rename check and the write.
        let _guard = if patch.name.is_some() {
            Some(self.create_lock.0.lock().await)
        } else {
            None
        };

        let mut definition = self.get(logical_id).await?;

        if let Some(name) = patch.name {
            let name = normalize_name(&name);
            if name.is_empty() {
                return Err(DocumentStoreError::InvalidDocument(
                    "collection name must not be blank".to_string(),
                ));
            }

            if name != definition.name {
                if let Some(owner) = self.find_by_name(&name).await? {
                    if owner.id != definition.id {
                        return Err(DocumentStoreError::CollectionAlreadyExists(name));
                    }
                }
                definition.slug = slugify(&name);
                definition.name = name;
            }
        }

        if let Some(description) = patch.description {
            definition.description = Some(description);
        }
        if let Some(fields) = patch.fields {
            definition.fields = fields;
        }
        if let Some(timestamps) = patch.timestamps {
            definition.timestamps = timestamps;
        }
        if let Some(settings) = patch.settings {
            definition.settings = settings;
        }
        if let Some(indexes) = patch.indexes {
            definition.indexes = Some(indexes);
        }

        definition.updated_at = next_timestamp(BsonDateTime::from_chrono(definition.updated_at)).to_chrono();

        let mut batch = WriteBatch::new();
        batch.update(CATALOG_COLLECTION, definition.backend_ref.clone(), definition.to_document()?);
        commit(self.backend, batch).await?;

        debug!(collection = %definition.id, "collection updated");

        Ok(definition)
    }

    /// Deletes a collection's documents and its definition in one atomic batch.
    ///
    /// The batch holds one write per document plus the definition, so the
    /// backend's [`max_batch_writes`](crate::backend::BackendCapabilities::max_batch_writes)
    /// bounds the size of collection that can be deleted. A rejected batch
    /// leaves both the documents and the definition in place.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::CollectionNotFound`] if `logical_id` does not resolve.
    pub async fn delete(&self, logical_id: &str) -> DocumentStoreResult<()> {
        let definition = self.get(logical_id).await?;
        let space = self.data_space(&definition);
        let ids = self.backend.list_document_ids(&space).await?;
        let count = ids.len();

        let mut batch = WriteBatch::new();
        for id in ids {
            batch.delete(&space, id);
        }
        batch.delete(CATALOG_COLLECTION, definition.backend_ref.clone());
        commit(self.backend, batch).await?;

        info!(collection = %definition.id, documents = count, "collection deleted");

        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> DocumentStoreResult<Option<CollectionDefinition>> {
        self.find_one(Predicate::new("name", FieldOp::Eq, name)).await
    }

    async fn find_one(&self, predicate: Predicate) -> DocumentStoreResult<Option<CollectionDefinition>> {
        let mut query = NativeQuery::new(vec![predicate]);
        query.limit = Some(1);

        self.backend
            .query_documents(query, CATALOG_COLLECTION)
            .await?
            .into_iter()
            .next()
            .map(CollectionDefinition::from_stored)
            .transpose()
    }
}
