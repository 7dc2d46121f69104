//! Main docbridge crate: a provider-agnostic data-access layer for dynamic
//! document collections.
//!
//! This crate is the primary entry point for users of docbridge. It
//! re-exports the core types from the sub-crates and provides the
//! [`DataService`](service::DataService) facade, which owns one backend
//! session and runs every collection and document operation through it.
//!
//! # Features
//!
//! - **Collection catalog** - Named, idempotently created collections with field declarations
//! - **Document CRUD** - Store-managed identities and `createdAt`/`updatedAt` timestamps
//! - **Atomic batches** - Multi-document writes that commit all-or-nothing
//! - **Queries and search** - Filtered, sorted, windowed queries and multi-field prefix search
//! - **Multiple backends** - A hierarchical in-memory store and a MongoDB flat store
//!
//! # Quick Start
//!
//! ```ignore
//! use docbridge::prelude::*;
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = DataService::new(ServiceConfig::hierarchical("api-key", "my-project"));
//!     service.connect().await?;
//!
//!     let posts = service
//!         .create_collection(
//!             NewCollection::new("Posts")
//!                 .field(FieldDefinition::new("title", FieldType::Text).searchable()),
//!             Vec::new(),
//!         )
//!         .await?;
//!
//!     service.create_document(&posts.id, doc! { "title": "Hello", "views": 0 }).await?;
//!
//!     let drafts = service
//!         .query_documents(
//!             &posts.id,
//!             &QuerySpec::builder()
//!                 .prefix_contains("title", "He")
//!                 .order_by("createdAt", SortDirection::Desc)
//!                 .limit(10)
//!                 .build(),
//!         )
//!         .await?;
//!
//!     println!("found {} of {}", drafts.len(), drafts.total);
//!
//!     service.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Hierarchical in-memory store for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod config;
pub mod external;
pub mod prelude;
pub mod service;

pub use docbridge_core::{backend, batch, catalog, error, id, page, query, record, search, store, translate};
pub use service::DataService;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docbridge_memory::{InMemoryStore, InMemoryStoreBuilder, DEFAULT_MAX_BATCH_WRITES};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docbridge_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
