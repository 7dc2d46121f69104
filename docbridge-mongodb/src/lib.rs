//! MongoDB backend implementation for docbridge.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend`
//! trait, the flat collection counterpart of the in-memory hierarchical store.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docbridge = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Native queries** - Predicates and sort keys run on MongoDB's query engine
//! - **Transactional batches** - Batches commit inside a session transaction
//! - **Key sanitization** - Dots, dollar signs and null bytes in field names are escaped
//!
//! # Connection
//!
//! The builder takes a connection string and a database name. Credential
//! fields are checked before the client is created.
//!
//! # Example
//!
//! ```ignore
//! use docbridge::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "my_database")
//!         .transactions(true)
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```


pub mod store;
pub mod query;
pub mod sanitizer;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
