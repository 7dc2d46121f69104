//! Pagination and result types for queries and searches.
//!
//! [`Page`] is the result shape of both [`QueryTranslator`](crate::translate::QueryTranslator)
//! and [`SearchEngine`](crate::search::SearchEngine). [`PaginationParams`]
//! describes a 1-indexed numeric page window.

use serde::{Deserialize, Serialize};
use std::cmp::min;

/// Default page size for searches.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A single page of results.
///
/// # Example
///
/// ```ignore
/// use docbridge::page::Page;
///
/// let page: Page<String> = Page::builder(vec!["item1".to_string()])
///     .with_total(100)
///     .with_has_more(true)
///     .build();
///
/// assert_eq!(page.data.len(), 1);
/// assert_eq!(page.total, 100);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The items contained in this page, in result order.
    pub data: Vec<T>,
    /// Count of all matching items before pagination.
    pub total: usize,
    /// Whether items exist past this page.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Creates a new builder for constructing a page with custom settings.
    pub fn builder(data: Vec<T>) -> PageBuilder<T> {
        PageBuilder::new(data)
    }

    /// Number of items in this page.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            has_more: false,
        }
    }
}

/// Builder for constructing [`Page`] instances with fluent API.
pub struct PageBuilder<T> {
    data: Vec<T>,
    total: usize,
    has_more: bool,
}

impl<T> PageBuilder<T> {
    /// Creates a new builder with the given items.
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data,
            total: 0,
            has_more: false,
        }
    }

    /// Sets the total count of matching items.
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = total;
        self
    }

    /// Sets whether items exist past this page.
    pub fn with_has_more(mut self, has_more: bool) -> Self {
        self.has_more = has_more;
        self
    }

    /// Builds and returns the final [`Page`] instance.
    pub fn build(self) -> Page<T> {
        Page {
            data: self.data,
            total: self.total,
            has_more: self.has_more,
        }
    }
}

/// Parameters for paginating through an in-memory result set.
///
/// Pages are 1-indexed; page `0` is treated as page `1`.
///
/// # Example
///
/// ```ignore
/// use docbridge::page::PaginationParams;
///
/// let params = PaginationParams::new(3, 20);
/// assert_eq!(params.offset(), 40);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    /// The page number (1-indexed).
    pub page: usize,
    /// Number of items per page.
    pub per_page: usize,
}

impl PaginationParams {
    /// Creates new pagination parameters.
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page }
    }

    /// Creates a new builder for constructing pagination parameters.
    pub fn builder() -> PaginationParamsBuilder {
        PaginationParamsBuilder::new()
    }

    /// Number of items to skip: `(page - 1) * per_page`.
    pub fn offset(&self) -> usize {
        self.page.max(1).saturating_sub(1).saturating_mul(self.per_page)
    }

    /// Slices `items` to this page.
    ///
    /// `total` is the length of `items`; `has_more` is `offset + per_page < total`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let items: Vec<i32> = (1..=100).collect();
    /// let page = PaginationParams::new(2, 10).paginate(items);
    ///
    /// assert_eq!(page.data, vec![11, 12, 13, 14, 15, 16, 17, 18, 19, 20]);
    /// assert!(page.has_more);
    /// ```
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let offset = self.offset();
        let has_more = offset.saturating_add(self.per_page) < total;

        if offset >= total {
            return Page::builder(Vec::new())
                .with_total(total)
                .build();
        }

        let end = min(offset.saturating_add(self.per_page), total);
        let data = items
            .into_iter()
            .skip(offset)
            .take(end - offset)
            .collect();

        Page::builder(data)
            .with_total(total)
            .with_has_more(has_more)
            .build()
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PAGE_SIZE }
    }
}

/// Builder for constructing [`PaginationParams`] instances.
pub struct PaginationParamsBuilder {
    page: Option<usize>,
    per_page: Option<usize>,
}

impl PaginationParamsBuilder {
    /// Creates a new builder with no parameters set.
    pub fn new() -> Self {
        Self { page: None, per_page: None }
    }

    /// Sets the page number (1-indexed).
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the number of items per page.
    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Builds and returns the [`PaginationParams`].
    ///
    /// Uses defaults for any unset values (page=1, per_page=10).
    pub fn build(self) -> PaginationParams {
        PaginationParams {
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}

impl Default for PaginationParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginates_middle_page() {
        let page = PaginationParams::new(2, 10).paginate((1..=25).collect::<Vec<_>>());

        assert_eq!(page.data, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
        assert!(page.has_more);
    }

    #[test]
    fn last_partial_page_has_no_more() {
        let page = PaginationParams::new(3, 10).paginate((1..=25).collect::<Vec<_>>());

        assert_eq!(page.data.len(), 5);
        assert!(!page.has_more);
    }

    #[test]
    fn exact_final_page_has_no_more() {
        let page = PaginationParams::new(2, 10).paginate((1..=20).collect::<Vec<_>>());

        assert_eq!(page.data.len(), 10);
        assert!(!page.has_more);
    }

    #[test]
    fn page_past_end_keeps_total() {
        let page = PaginationParams::new(9, 10).paginate(vec![1, 2, 3]);

        assert!(page.is_empty());
        assert_eq!(page.total, 3);
        assert!(!page.has_more);
    }

    #[test]
    fn page_zero_is_first_page() {
        assert_eq!(PaginationParams::new(0, 10).offset(), 0);
        assert_eq!(PaginationParams::builder().with_page(4).build().offset(), 30);
    }
}
