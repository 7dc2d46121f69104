mod common;

use async_trait::async_trait;
use bson::doc;
use chrono::Utc;
use std::sync::{Arc, Mutex};

use docbridge::prelude::*;

#[tokio::test]
async fn calls_before_connect_are_not_connected() {
    let service = DataService::new(common::config());

    assert!(!service.is_connected().await);
    assert!(matches!(
        service.list_collections().await,
        Err(DocumentStoreError::NotConnected)
    ));
    assert!(matches!(
        service.get_document("posts_123456", "x").await,
        Err(DocumentStoreError::NotConnected)
    ));
}

#[tokio::test]
async fn blank_api_key_is_rejected_before_connecting() {
    let service = DataService::new(ServiceConfig::hierarchical("  ", "project"));

    let err = service.connect().await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidCredentials(_)));
    assert!(!service.is_connected().await);
}

#[tokio::test]
async fn disconnect_closes_the_session() {
    let service = common::connected().await;
    let posts = common::collection(&service, "posts").await;

    service.disconnect().await.unwrap();
    service.disconnect().await.unwrap();

    assert!(!service.is_connected().await);
    assert!(matches!(
        service.create_document(&posts.id, doc! { "title": "x" }).await,
        Err(DocumentStoreError::NotConnected)
    ));
}

#[tokio::test]
async fn concurrent_connects_share_one_session() {
    let service = DataService::new(common::config());

    let (a, b) = futures::join!(service.connect(), service.connect());
    a.unwrap();
    b.unwrap();

    let posts = common::collection(&service, "posts").await;
    service.connect().await.unwrap();

    assert_eq!(service.get_collection(&posts.id).await.unwrap(), posts);
}

#[cfg(not(feature = "mongodb"))]
#[tokio::test]
async fn flat_backend_without_feature_is_unsupported() {
    let service = DataService::new(ServiceConfig::flat("mongodb://localhost:27017", "app"));

    let err = service.connect().await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::Unsupported(_)));
    assert!(!service.is_connected().await);
}

#[derive(Debug, Default)]
struct RecordingBlobs {
    uploads: Mutex<Vec<(BlobKind, String)>>,
}

#[async_trait]
impl BlobStorage for RecordingBlobs {
    async fn upload(&self, kind: BlobKind, upload: BlobUpload) -> DocumentStoreResult<BlobInfo> {
        self.uploads.lock().unwrap().push((kind, upload.name.clone()));

        Ok(BlobInfo {
            id: format!("blob-{}", upload.name),
            kind,
            name: upload.name,
            content_type: upload.content_type,
            size: upload.data.len() as u64,
            url: None,
            created_at: Utc::now(),
        })
    }

    async fn get(&self, _id: &str) -> DocumentStoreResult<Option<BlobInfo>> {
        Ok(None)
    }

    async fn update(&self, id: &str, _upload: BlobUpload) -> DocumentStoreResult<BlobInfo> {
        Err(DocumentStoreError::DocumentNotFound(id.to_string(), "blobs".to_string()))
    }

    async fn delete(&self, _id: &str) -> DocumentStoreResult<()> {
        Ok(())
    }

    async fn list(&self, _kind: Option<BlobKind>) -> DocumentStoreResult<Vec<BlobInfo>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn blob_calls_without_storage_are_unsupported() {
    let service = DataService::new(common::config());

    assert!(matches!(
        service.upload_image(BlobUpload::new("a.png", vec![1, 2, 3])).await,
        Err(DocumentStoreError::Unsupported(_))
    ));
    assert!(matches!(
        service.list_blobs(None).await,
        Err(DocumentStoreError::Unsupported(_))
    ));
}

#[tokio::test]
async fn blob_uploads_are_delegated_with_their_kind() {
    let blobs = Arc::new(RecordingBlobs::default());
    let service = DataService::new(common::config()).with_blob_storage(blobs.clone());

    let image = service
        .upload_image(BlobUpload::new("a.png", vec![1, 2, 3]).with_content_type("image/png"))
        .await
        .unwrap();
    let file = service
        .upload_file(BlobUpload::new("notes.txt", vec![0; 8]))
        .await
        .unwrap();

    assert_eq!(image.kind, BlobKind::Image);
    assert_eq!(image.size, 3);
    assert_eq!(image.content_type.as_deref(), Some("image/png"));
    assert_eq!(file.kind, BlobKind::File);
    assert_eq!(
        *blobs.uploads.lock().unwrap(),
        vec![(BlobKind::Image, "a.png".to_string()), (BlobKind::File, "notes.txt".to_string())]
    );
    assert!(service.get_blob("blob-a.png").await.unwrap().is_none());
}

#[derive(Debug)]
struct StrictQuota {
    limit: u64,
}

#[async_trait]
impl QuotaGuard for StrictQuota {
    async fn check_operation_feasibility(
        &self,
        _operation: OperationType,
        size: Option<u64>,
        _target: &str,
    ) -> DocumentStoreResult<Feasibility> {
        match size {
            Some(size) if size > self.limit => Ok(Feasibility::denied("storage limit reached")),
            _ => Ok(Feasibility::allowed()),
        }
    }

    async fn usage_stats(&self) -> DocumentStoreResult<UsageStats> {
        Ok(UsageStats {
            usage: doc! { "storageBytes": self.limit as i64 },
            alerts: vec!["near limit".to_string()],
            recommendations: Vec::new(),
        })
    }
}

#[tokio::test]
async fn quota_without_guard_is_always_feasible() {
    let service = DataService::new(common::config());

    let answer = service
        .check_operation_feasibility(OperationType::Upload, Some(u64::MAX), "images")
        .await
        .unwrap();

    assert_eq!(answer, Feasibility::allowed());
    assert_eq!(service.usage_stats().await.unwrap(), UsageStats::default());
}

#[tokio::test]
async fn quota_guard_can_deny() {
    let service = DataService::new(common::config()).with_quota_guard(Arc::new(StrictQuota { limit: 100 }));

    let small = service
        .check_operation_feasibility(OperationType::Write, Some(10), "posts")
        .await
        .unwrap();
    let large = service
        .check_operation_feasibility(OperationType::Upload, Some(1000), "images")
        .await
        .unwrap();

    assert!(small.feasible);
    assert!(!large.feasible);
    assert_eq!(large.reason.as_deref(), Some("storage limit reached"));
    assert_eq!(service.usage_stats().await.unwrap().alerts, vec!["near limit".to_string()]);
}
