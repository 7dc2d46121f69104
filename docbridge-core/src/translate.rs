//! Execution of backend-neutral queries with a known total.
//!
//! The translator lowers a [`QuerySpec`] into a [`NativeQuery`], counts the
//! full match set, and fetches one window of it. Offsets are expressed the way
//! the backend prefers: a native skip, or a resume cursor positioned on the
//! last row before the window.

use tracing::debug;

use crate::{
    backend::StoreBackend,
    error::{DocumentStoreError, DocumentStoreResult},
    page::Page,
    query::{NativeQuery, Predicate, QuerySpec},
    record::Record,
};

/// Runs [`QuerySpec`]s against one backend.
#[derive(Debug)]
pub struct QueryTranslator<'a, B: StoreBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: StoreBackend + ?Sized> QueryTranslator<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Executes `query` against `collection`.
    ///
    /// `total` is the size of the full match set regardless of the window.
    /// `has_more` is `true` exactly when matches remain after this window.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] for a zero limit, an empty
    /// field name, or a clause the backend cannot execute.
    pub async fn execute(&self, collection: &str, query: &QuerySpec) -> DocumentStoreResult<Page<Record>> {
        let base = compile(query)?;
        let total = self
            .backend
            .count_documents(base.predicates.clone(), collection)
            .await?;
        let offset = query.offset.unwrap_or(0);

        debug!(collection, total, offset, limit = ?query.limit, "executing query");

        if offset >= total {
            return Ok(Page::builder(Vec::new()).with_total(total).build());
        }

        let mut window = base.clone();
        window.limit = query.limit;

        if offset > 0 {
            if self.backend.capabilities().cursor_resume {
                let mut head = base;
                head.limit = Some(offset);

                let skipped = self.backend.query_documents(head, collection).await?;
                if skipped.len() < offset {
                    // The match set shrank between the count and the fetch.
                    return Ok(Page::builder(Vec::new()).with_total(total).build());
                }
                window.start_after = skipped.into_iter().last();
            } else {
                window.skip = Some(offset);
            }
        }

        let data = self
            .backend
            .query_documents(window, collection)
            .await?
            .into_iter()
            .map(|stored| stored.into_record())
            .collect::<DocumentStoreResult<Vec<_>>>()?;
        let has_more = offset + data.len() < total;

        Ok(Page::builder(data)
            .with_total(total)
            .with_has_more(has_more)
            .build())
    }
}

/// Lowers a query into native predicates and sort keys, without a window.
pub fn compile(query: &QuerySpec) -> DocumentStoreResult<NativeQuery> {
    if query.limit == Some(0) {
        return Err(DocumentStoreError::InvalidQuery("limit must be at least 1".to_string()));
    }

    if let Some(clause) = query.filters.iter().find(|clause| clause.field.is_empty()) {
        return Err(DocumentStoreError::InvalidQuery(format!(
            "where clause {:?} has an empty field name",
            clause.op
        )));
    }

    if query.order_by.iter().any(|key| key.field.is_empty()) {
        return Err(DocumentStoreError::InvalidQuery("sort key has an empty field name".to_string()));
    }

    Ok(NativeQuery {
        predicates: query.filters.iter().flat_map(Predicate::lower).collect(),
        order_by: query.order_by.clone(),
        ..NativeQuery::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FieldOp, SortDirection};

    #[test]
    fn compile_flattens_clauses_in_order() {
        let query = QuerySpec::builder()
            .equals("status", "live")
            .prefix_contains("title", "ab")
            .order_by("title", SortDirection::Asc)
            .limit(3)
            .offset(6)
            .build();

        let native = compile(&query).unwrap();

        let ops = native.predicates.iter().map(|p| p.op).collect::<Vec<_>>();
        assert_eq!(ops, vec![FieldOp::Eq, FieldOp::Gte, FieldOp::Lt]);
        assert_eq!(native.order_by, query.order_by);
        assert_eq!(native.limit, None);
        assert_eq!(native.skip, None);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = compile(&QuerySpec::builder().limit(0).build()).unwrap_err();

        assert!(matches!(err, DocumentStoreError::InvalidQuery(_)));
    }

    #[test]
    fn empty_field_is_rejected() {
        let err = compile(&QuerySpec::builder().equals("", 1).build()).unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidQuery(_)));

        let err = compile(&QuerySpec::builder().order_by("", SortDirection::Asc).build()).unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidQuery(_)));
    }
}
