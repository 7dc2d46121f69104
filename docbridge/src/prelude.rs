//! Convenient re-exports of commonly used types from docbridge.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docbridge::prelude::*;
//! ```
//!
//! This provides access to:
//! - The service facade and its configuration
//! - Collection definitions and their field declarations
//! - Records, queries, pages and batch inputs
//! - Store backends and builders
//! - Error types

pub use docbridge_core::{
    backend::{BackendCapabilities, BackendKind, StoreBackend, StoreBackendBuilder, WriteBatch},
    batch::DocumentUpdate,
    catalog::{CollectionDefinition, CollectionPatch, CollectionSettings, FieldDefinition, FieldType, IndexDefinition, NewCollection, Visibility},
    error::{DocumentStoreError, DocumentStoreResult},
    page::{Page, PaginationParams},
    query::{QuerySpec, SortDirection, WhereOp},
    record::{Fields, Record},
};

pub use crate::{
    config::{BackendConfig, ServiceConfig},
    external::{BlobInfo, BlobKind, BlobStorage, BlobUpload, Feasibility, OperationType, QuotaGuard, UsageStats},
    service::DataService,
};
