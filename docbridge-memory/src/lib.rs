//! In-memory hierarchical storage backend for docbridge.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `StoreBackend` trait that follows the rules of a path-addressed document
//! database. It is the reference backend for development and tests.
//!
//! # Features
//!
//! - **Atomic batches** - A batch is validated as a whole before any write is applied
//! - **Batch limit** - Batches over the configured write limit are rejected whole
//! - **Cursor pagination** - Offsets resume strictly after a cursor row
//! - **Deterministic order** - Sort ties are broken by document id
//!
//! # Quick Start
//!
//! ```ignore
//! use docbridge::{backend::StoreBackendBuilder, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().max_batch_writes(500).build().await?;
//!     let space = backend.data_space("abc");
//!     assert_eq!(space, "_collections/abc/documents");
//!     Ok(())
//! }
//! ```


pub mod store;
pub mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder, DEFAULT_MAX_BATCH_WRITES};
