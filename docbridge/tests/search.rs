mod common;

use bson::doc;
use docbridge::prelude::*;

const FIELDS: [&str; 3] = ["title", "summary", "tag"];

#[tokio::test]
async fn match_on_two_fields_appears_once() {
    let service = common::connected().await;
    let posts = common::collection_with(
        &service,
        "posts",
        vec![
            doc! { "title": "rust book", "summary": "rust intro", "tag": "lang" },
            doc! { "title": "go book", "summary": "rusty tools", "tag": "lang" },
            doc! { "title": "python", "summary": "snakes", "tag": "lang" },
        ],
    )
    .await;

    let page = service
        .search_documents(&posts.id, "rus", &FIELDS, PaginationParams::default())
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    assert!(!page.has_more);
    let mut titles = page
        .data
        .iter()
        .map(|r| r.fields.get_str("title").unwrap())
        .collect::<Vec<_>>();
    titles.sort();
    assert_eq!(titles, vec!["go book", "rust book"]);
}

#[tokio::test]
async fn search_is_case_sensitive_and_prefix_only() {
    let service = common::connected().await;
    let posts = common::collection_with(&service, "posts", vec![doc! { "title": "rust book" }]).await;

    for text in ["Rust", "book"] {
        let page = service
            .search_documents(&posts.id, text, &["title"], PaginationParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0, "searching {:?}", text);
    }
}

#[tokio::test]
async fn results_are_paginated_after_dedup() {
    let service = common::connected().await;
    let posts = common::collection_with(
        &service,
        "posts",
        (0..12)
            .map(|n| doc! { "title": format!("item {}", n), "summary": format!("item summary {}", n) })
            .collect(),
    )
    .await;

    let second = service
        .search_documents(&posts.id, "item", &["title", "summary"], PaginationParams::new(2, 5))
        .await
        .unwrap();
    let third = service
        .search_documents(&posts.id, "item", &["title", "summary"], PaginationParams::new(3, 5))
        .await
        .unwrap();

    assert_eq!(second.total, 12);
    assert_eq!(second.len(), 5);
    assert!(second.has_more);
    assert_eq!(third.len(), 2);
    assert!(!third.has_more);
}

#[tokio::test]
async fn empty_field_list_matches_nothing() {
    let service = common::connected().await;
    let posts = common::collection_with(&service, "posts", vec![doc! { "title": "rust" }]).await;

    let page = service
        .search_documents::<&str>(&posts.id, "rust", &[], PaginationParams::default())
        .await
        .unwrap();

    assert!(page.is_empty());
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn zero_page_size_is_invalid() {
    let service = common::connected().await;
    let posts = common::collection(&service, "posts").await;

    let err = service
        .search_documents(&posts.id, "x", &["title"], PaginationParams::new(1, 0))
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidQuery(_)));
}

#[tokio::test]
async fn searchable_fields_come_from_the_definition() {
    let service = common::connected().await;
    let posts = service
        .create_collection(
            NewCollection::new("posts")
                .field(FieldDefinition::new("title", FieldType::Text).searchable())
                .field(FieldDefinition::new("body", FieldType::RichText)),
            vec![doc! { "title": "alpha", "body": "alpha body" }, doc! { "title": "beta", "body": "alphabet" }],
        )
        .await
        .unwrap();

    let page = service
        .search_documents(&posts.id, "alpha", &posts.searchable_fields(), PaginationParams::default())
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].fields.get_str("title").unwrap(), "alpha");
}
