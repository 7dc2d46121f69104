mod common;

use bson::doc;
use docbridge::{
    backend::StoreBackend,
    catalog::{Catalog, CreateLock},
    memory::InMemoryStore,
    prelude::*,
    query::QuerySpec,
};

#[tokio::test]
async fn create_is_idempotent_by_normalized_name() {
    let service = common::connected().await;

    let first = service
        .create_collection(NewCollection::new("products"), Vec::new())
        .await
        .unwrap();
    let second = service
        .create_collection(NewCollection::new("  PRODUCTS "), Vec::new())
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.backend_ref, second.backend_ref);

    let all = service.list_collections().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "products");
}

#[tokio::test]
async fn concurrent_creates_of_one_name_share_identity() {
    let service = common::connected().await;

    let (a, b) = futures::join!(
        service.create_collection(NewCollection::new("Orders"), Vec::new()),
        service.create_collection(NewCollection::new("orders"), Vec::new()),
    );

    assert_eq!(a.unwrap().id, b.unwrap().id);
    assert_eq!(service.list_collections().await.unwrap().len(), 1);
}

#[tokio::test]
async fn created_definition_is_normalized() {
    let service = common::connected().await;

    let definition = service
        .create_collection(
            NewCollection::new(" Blog Posts ")
                .description("articles")
                .field(FieldDefinition::new("title", FieldType::Text).searchable()),
            Vec::new(),
        )
        .await
        .unwrap();

    assert_eq!(definition.name, "blog posts");
    assert_eq!(definition.slug, "blog_posts");
    assert!(definition.id.starts_with("blog_posts_"));
    assert!(definition.timestamps);
    assert_eq!(definition.created_at, definition.updated_at);
    assert_eq!(service.get_collection(&definition.id).await.unwrap(), definition);
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let service = common::connected().await;

    let err = service
        .create_collection(NewCollection::new("   "), Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
}

#[tokio::test]
async fn seed_documents_share_the_definition_timestamp() {
    let service = common::connected().await;

    let definition = service
        .create_collection(
            NewCollection::new("tags"),
            vec![doc! { "label": "a" }, doc! { "label": "b" }],
        )
        .await
        .unwrap();

    let page = service
        .query_documents(&definition.id, &QuerySpec::new())
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    for record in page.data {
        assert_eq!(record.created_at.to_chrono(), definition.created_at);
        assert_eq!(record.created_at, record.updated_at);
    }
}

#[tokio::test]
async fn existing_collection_ignores_seed() {
    let service = common::connected().await;
    let definition = common::collection(&service, "tags").await;

    service
        .create_collection(NewCollection::new("tags"), vec![doc! { "label": "late" }])
        .await
        .unwrap();

    let page = service
        .query_documents(&definition.id, &QuerySpec::new())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn get_many_skips_unknown_names() {
    let service = common::connected().await;
    common::collection(&service, "alpha").await;
    common::collection(&service, "beta").await;

    let found = service
        .get_collections(&["ALPHA ", "missing"])
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "alpha");
}

#[tokio::test]
async fn unknown_collection_is_not_found() {
    let service = common::connected().await;

    let err = service.get_collection("nope_123456").await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::CollectionNotFound(id) if id == "nope_123456"));
}

#[tokio::test]
async fn update_renames_and_keeps_identity() {
    let service = common::connected().await;
    let definition = common::collection(&service, "gamma").await;

    let updated = service
        .update_collection(
            &definition.id,
            CollectionPatch {
                name: Some("Gamma Ray".into()),
                description: Some("renamed".into()),
                ..CollectionPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, definition.id);
    assert_eq!(updated.backend_ref, definition.backend_ref);
    assert_eq!(updated.name, "gamma ray");
    assert_eq!(updated.slug, "gamma_ray");
    assert_eq!(updated.description.as_deref(), Some("renamed"));
    assert_eq!(updated.created_at, definition.created_at);
    assert!(updated.updated_at > definition.updated_at);
    assert_eq!(service.get_collection(&definition.id).await.unwrap(), updated);
}

#[tokio::test]
async fn rename_onto_another_collection_conflicts() {
    let service = common::connected().await;
    common::collection(&service, "first").await;
    let second = common::collection(&service, "second").await;

    let err = service
        .update_collection(
            &second.id,
            CollectionPatch {
                name: Some(" FIRST".into()),
                ..CollectionPatch::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::CollectionAlreadyExists(name) if name == "first"));
    assert_eq!(service.get_collection(&second.id).await.unwrap().name, "second");
}

#[tokio::test]
async fn concurrent_create_and_rename_keep_names_unique() {
    let service = common::connected().await;
    let alpha = common::collection(&service, "alpha").await;

    let (created, renamed) = futures::join!(
        service.create_collection(NewCollection::new("beta"), Vec::new()),
        service.update_collection(
            &alpha.id,
            CollectionPatch {
                name: Some("Beta".into()),
                ..CollectionPatch::default()
            },
        ),
    );

    let created = created.unwrap();
    let betas = service
        .list_collections()
        .await
        .unwrap()
        .into_iter()
        .filter(|definition| definition.name == "beta")
        .collect::<Vec<_>>();
    assert_eq!(betas.len(), 1);

    match renamed {
        Ok(renamed) => assert_eq!(created.id, renamed.id),
        Err(err) => {
            assert!(matches!(err, DocumentStoreError::CollectionAlreadyExists(name) if name == "beta"));
            assert_eq!(service.get_collection(&alpha.id).await.unwrap().name, "alpha");
        }
    }
}

#[tokio::test]
async fn delete_cascades_to_documents() {
    let backend = InMemoryStore::new();
    let lock = CreateLock::default();
    let catalog = Catalog::new(&backend, &lock);

    let widgets = catalog
        .create(
            NewCollection::new("widgets"),
            vec![doc! { "n": 1 }, doc! { "n": 2 }, doc! { "n": 3 }],
        )
        .await
        .unwrap();
    let space = catalog.data_space(&widgets);
    assert_eq!(backend.list_document_ids(&space).await.unwrap().len(), 3);

    catalog.delete(&widgets.id).await.unwrap();

    assert!(catalog.list_all().await.unwrap().is_empty());
    assert!(backend.list_document_ids(&space).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleted_collection_rejects_document_calls() {
    let service = common::connected().await;
    let definition = common::collection_with(&service, "widgets", vec![doc! { "n": 1 }]).await;

    service.delete_collection(&definition.id).await.unwrap();

    assert!(matches!(
        service.delete_collection(&definition.id).await,
        Err(DocumentStoreError::CollectionNotFound(_))
    ));
    assert!(matches!(
        service.create_document(&definition.id, doc! {}).await,
        Err(DocumentStoreError::CollectionNotFound(_))
    ));
}

#[tokio::test]
async fn delete_over_batch_limit_keeps_everything() {
    let service = common::connected_with_batch_limit(3).await;
    let definition = common::collection_with(
        &service,
        "bulky",
        vec![doc! { "n": 1 }, doc! { "n": 2 }, doc! { "n": 3 }],
    )
    .await;

    let err = service.delete_collection(&definition.id).await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::Backend(_)));
    let page = service
        .query_documents(&definition.id, &QuerySpec::new())
        .await
        .unwrap();
    assert_eq!(page.total, 3);
}

#[tokio::test]
async fn delete_within_batch_limit_succeeds() {
    let service = common::connected_with_batch_limit(3).await;
    let definition = common::collection_with(&service, "small", vec![doc! { "n": 1 }, doc! { "n": 2 }]).await;

    service.delete_collection(&definition.id).await.unwrap();

    assert!(service.list_collections().await.unwrap().is_empty());
}
