//! A provider-agnostic data-access layer for dynamic document collections.
//!
//! This crate is the core of the docbridge project and provides:
//!
//! - **Store backend abstraction** ([`backend`]) - The capability trait every storage backend implements
//! - **Collection catalog** ([`catalog`]) - Registry of logical collections and their field declarations
//! - **Document store** ([`store`]) - Single-document CRUD with store-managed timestamps
//! - **Batch engine** ([`batch`]) - Atomic multi-document create, update and delete
//! - **Query construction** ([`query`]) - Backend-neutral queries and the native predicates they lower to
//! - **Query translator** ([`translate`]) - Query execution with totals and windowing
//! - **Search engine** ([`search`]) - Multi-field prefix search with de-duplication
//! - **Records** ([`record`]) - The canonical document shape
//! - **Identity generator** ([`id`]) - Short random and name-derived identifiers
//! - **Pagination** ([`page`]) - Page results and page windows
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docbridge_core::{catalog::{Catalog, CreateLock, NewCollection}, store::DocumentStore};
//! use bson::doc;
//!
//! let lock = CreateLock::default();
//! let posts = Catalog::new(&backend, &lock)
//!     .create(NewCollection::new("posts"), Vec::new())
//!     .await?;
//!
//! let space = backend.data_space(&posts.backend_ref);
//! let created = DocumentStore::new(&backend)
//!     .create(&space, doc! { "title": "Hello" })
//!     .await?;
//! ```

pub mod backend;
pub mod batch;
pub mod catalog;
pub mod error;
pub mod id;
pub mod page;
pub mod query;
pub mod record;
pub mod search;
pub mod store;
pub mod translate;
