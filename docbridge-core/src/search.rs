//! Prefix search across several fields of one collection.
//!
//! Each field is searched with its own prefix-range query. Results are merged
//! in field order, de-duplicated by id (the first occurrence wins), and only
//! then paginated, so `total` always counts distinct documents.

use std::collections::HashSet;
use tracing::debug;

use crate::{
    backend::StoreBackend,
    error::{DocumentStoreError, DocumentStoreResult},
    page::{Page, PaginationParams},
    query::{NativeQuery, prefix_range},
    record::Record,
};

/// Multi-field prefix search over one backend.
#[derive(Debug)]
pub struct SearchEngine<'a, B: StoreBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: StoreBackend + ?Sized> SearchEngine<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Finds documents where any of `fields` starts with `text`.
    ///
    /// Matching is case-sensitive and prefix-only. An empty `fields` list
    /// matches nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] if the page size is zero.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let page = SearchEngine::new(&backend)
    ///     .search("posts", "rus", &["title", "summary"], PaginationParams::new(1, 10))
    ///     .await?;
    /// ```
    pub async fn search<S: AsRef<str>>(
        &self,
        collection: &str,
        text: &str,
        fields: &[S],
        params: PaginationParams,
    ) -> DocumentStoreResult<Page<Record>> {
        if params.per_page == 0 {
            return Err(DocumentStoreError::InvalidQuery("page size must be at least 1".to_string()));
        }

        let mut seen = HashSet::new();
        let mut merged = Vec::new();

        for field in fields {
            let field = field.as_ref();
            if field.is_empty() {
                return Err(DocumentStoreError::InvalidQuery("search field name is empty".to_string()));
            }

            let hits = self
                .backend
                .query_documents(NativeQuery::new(prefix_range(field, text).to_vec()), collection)
                .await?;

            for hit in hits {
                if seen.insert(hit.id.clone()) {
                    merged.push(hit);
                }
            }
        }

        debug!(collection, fields = fields.len(), matches = merged.len(), "search merged");

        let page = params.paginate(merged);
        let data = page
            .data
            .into_iter()
            .map(|stored| stored.into_record())
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        Ok(Page::builder(data)
            .with_total(page.total)
            .with_has_more(page.has_more)
            .build())
    }
}
