//! Collaborators the service delegates to without owning their logic.
//!
//! - [`BlobStorage`]: image and file storage, reached through the service's
//!   blob pass-through methods.
//! - [`QuotaGuard`]: advisory usage checks. The service never enforces them;
//!   callers that want quota protection ask before writing.

use async_trait::async_trait;
use bson::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use docbridge_core::error::DocumentStoreResult;

/// The two blob categories the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobKind {
    Image,
    File,
}

/// Content handed to [`BlobStorage::upload`] and [`BlobStorage::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct BlobUpload {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl BlobUpload {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            data,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Metadata of a stored blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobInfo {
    pub id: String,
    pub kind: BlobKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Image and file storage.
#[async_trait]
pub trait BlobStorage: Send + Sync + Debug {
    async fn upload(&self, kind: BlobKind, upload: BlobUpload) -> DocumentStoreResult<BlobInfo>;

    /// Returns `None` when no blob has this id.
    async fn get(&self, id: &str) -> DocumentStoreResult<Option<BlobInfo>>;

    /// Replaces the content of an existing blob.
    async fn update(&self, id: &str, upload: BlobUpload) -> DocumentStoreResult<BlobInfo>;

    async fn delete(&self, id: &str) -> DocumentStoreResult<()>;

    /// Lists blobs, optionally restricted to one kind.
    async fn list(&self, kind: Option<BlobKind>) -> DocumentStoreResult<Vec<BlobInfo>>;
}

/// Operation classes a [`QuotaGuard`] is asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Read,
    Write,
    Delete,
    Upload,
}

/// Answer to a feasibility check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feasibility {
    pub feasible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Feasibility {
    pub fn allowed() -> Self {
        Self { feasible: true, reason: None }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            feasible: false,
            reason: Some(reason.into()),
        }
    }
}

/// Current usage as reported by a [`QuotaGuard`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageStats {
    pub usage: Document,
    pub alerts: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Advisory pre-flight checks against a usage plan.
#[async_trait]
pub trait QuotaGuard: Send + Sync + Debug {
    /// Asks whether an operation of `size` bytes (when known) against `target` fits the plan.
    async fn check_operation_feasibility(
        &self,
        operation: OperationType,
        size: Option<u64>,
        target: &str,
    ) -> DocumentStoreResult<Feasibility>;

    async fn usage_stats(&self) -> DocumentStoreResult<UsageStats>;
}
