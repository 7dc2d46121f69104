#![allow(dead_code)]

use bson::Document;
use docbridge::{config::HierarchicalConfig, prelude::*};

pub fn config() -> ServiceConfig {
    ServiceConfig::hierarchical("test-key", "test-project")
}

pub async fn connected() -> DataService {
    let service = DataService::new(config());
    service.connect().await.unwrap();
    service
}

pub async fn connected_with_batch_limit(limit: usize) -> DataService {
    let service = DataService::new(ServiceConfig::new(BackendConfig::Hierarchical(HierarchicalConfig {
        api_key: "test-key".into(),
        project_id: "test-project".into(),
        max_batch_writes: Some(limit),
    })));
    service.connect().await.unwrap();
    service
}

pub async fn collection(service: &DataService, name: &str) -> CollectionDefinition {
    service
        .create_collection(NewCollection::new(name), Vec::new())
        .await
        .unwrap()
}

pub async fn collection_with(service: &DataService, name: &str, items: Vec<Document>) -> CollectionDefinition {
    let definition = collection(service, name).await;
    service.batch_create(&definition.id, items).await.unwrap();
    definition
}
