//! Query construction for document collections.
//!
//! Two layers live here:
//!
//! - [`QuerySpec`] is the backend-neutral request callers build: ordered where
//!   clauses, ordered sort keys, and an optional limit/offset.
//! - [`NativeQuery`] is what a backend executes: a conjunction of primitive
//!   [`Predicate`]s, sort keys, and a pagination window. The
//!   [`QueryTranslator`](crate::translate::QueryTranslator) lowers one into the
//!   other, and backends consume predicates through [`QueryVisitor`].
//!
//! # Example
//!
//! ```ignore
//! use docbridge::query::{QuerySpec, SortDirection};
//!
//! let query = QuerySpec::builder()
//!     .equals("status", "active")
//!     .prefix_contains("title", "rus")
//!     .order_by("createdAt", SortDirection::Desc)
//!     .limit(10)
//!     .offset(20)
//!     .build();
//! ```

use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::{error::DocumentStoreError, record::StoredDocument};

/// Upper bound appended to a prefix to form the half-open range `[prefix, prefix + PREFIX_UPPER_BOUND)`.
///
/// This is the highest code point of the Basic Multilingual Plane private-use
/// area, which sorts after every character that realistically follows a prefix.
pub const PREFIX_UPPER_BOUND: char = '\u{f8ff}';

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Operators available to callers in a where clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WhereOp {
    /// Exact match.
    Equals,
    /// Strictly greater than.
    GreaterThan,
    /// Strictly less than.
    LessThan,
    /// Prefix match on a string field.
    ///
    /// Despite the name this only matches values that *start with* the
    /// operand: it is executed as the lexicographic range
    /// `[value, value + PREFIX_UPPER_BOUND)`. Substrings at any other position
    /// are not found.
    PrefixContains,
}

/// One `(field, operator, value)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    pub field: String,
    pub op: WhereOp,
    pub value: Bson,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// A backend-neutral query over one collection.
///
/// Where clauses and sort keys are applied in the order given. Ties left by
/// the sort keys are broken by backend-native document order, which is not
/// guaranteed to agree across backends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    #[serde(default, rename = "where")]
    pub filters: Vec<WhereClause>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl QuerySpec {
    /// Creates a query matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QuerySpecBuilder {
        QuerySpecBuilder::new()
    }
}

/// Fluent builder for [`QuerySpec`].
#[derive(Debug, Clone, Default)]
pub struct QuerySpecBuilder {
    query: QuerySpec,
}

impl QuerySpecBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        Self { query: QuerySpec::default() }
    }

    /// Appends a where clause.
    pub fn filter(mut self, field: impl Into<String>, op: WhereOp, value: impl Into<Bson>) -> Self {
        self.query.filters.push(WhereClause {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Appends an `equals` clause.
    pub fn equals(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.filter(field, WhereOp::Equals, value)
    }

    /// Appends a `greaterThan` clause.
    pub fn greater_than(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.filter(field, WhereOp::GreaterThan, value)
    }

    /// Appends a `lessThan` clause.
    pub fn less_than(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.filter(field, WhereOp::LessThan, value)
    }

    /// Appends a `prefixContains` clause. See [`WhereOp::PrefixContains`].
    pub fn prefix_contains(self, field: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.filter(field, WhereOp::PrefixContains, prefix.into())
    }

    /// Appends a sort key.
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.order_by.push(OrderBy { field: field.into(), direction });
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of matching documents to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> QuerySpec {
        self.query
    }
}

/// Primitive comparison operators every backend must execute natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to.
    Eq,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
}

/// A single native field comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: FieldOp,
    pub value: Bson,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: FieldOp, value: impl Into<Bson>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Lowers a caller-facing clause into one or two native predicates.
    pub fn lower(clause: &WhereClause) -> Vec<Predicate> {
        match clause.op {
            WhereOp::Equals => vec![Predicate::new(&*clause.field, FieldOp::Eq, clause.value.clone())],
            WhereOp::GreaterThan => vec![Predicate::new(&*clause.field, FieldOp::Gt, clause.value.clone())],
            WhereOp::LessThan => vec![Predicate::new(&*clause.field, FieldOp::Lt, clause.value.clone())],
            WhereOp::PrefixContains => prefix_range(&clause.field, &prefix_operand(&clause.value)).to_vec(),
        }
    }
}

/// Returns the two predicates bounding the half-open prefix range on `field`.
pub fn prefix_range(field: &str, prefix: &str) -> [Predicate; 2] {
    [
        Predicate::new(field, FieldOp::Gte, prefix),
        Predicate::new(field, FieldOp::Lt, format!("{}{}", prefix, PREFIX_UPPER_BOUND)),
    ]
}

fn prefix_operand(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The query a backend executes in one round trip.
///
/// Exactly one of `start_after` or `skip` is used to express an offset,
/// depending on [`BackendCapabilities::cursor_resume`](crate::backend::BackendCapabilities).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeQuery {
    /// Conjunction of predicates; empty matches everything.
    pub predicates: Vec<Predicate>,
    /// Multi-key sort, applied in order.
    pub order_by: Vec<OrderBy>,
    /// Resume strictly after this row of the same ordering.
    pub start_after: Option<StoredDocument>,
    /// Number of rows to skip.
    pub skip: Option<usize>,
    /// Maximum rows to return.
    pub limit: Option<usize>,
}

impl NativeQuery {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates, ..Self::default() }
    }
}

/// Visitor over native predicates, implemented once per backend.
///
/// The in-memory backend evaluates predicates against documents; the MongoDB
/// backend translates them into a filter document.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, predicates: &[Predicate]) -> Result<Self::Output, Self::Error>;
    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error>;

    fn visit_predicate(&mut self, predicate: &Predicate) -> Result<Self::Output, Self::Error> {
        self.visit_field(&predicate.field, predicate.op, &predicate.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_clause_order() {
        let query = QuerySpec::builder()
            .equals("a", 1)
            .greater_than("b", 2)
            .order_by("c", SortDirection::Desc)
            .order_by("d", SortDirection::Asc)
            .limit(5)
            .build();

        let fields = query.filters.iter().map(|c| c.field.as_str()).collect::<Vec<_>>();
        assert_eq!(fields, vec!["a", "b"]);
        assert_eq!(query.order_by[0].field, "c");
        assert_eq!(query.order_by[1].direction, SortDirection::Asc);
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, None);
    }

    #[test]
    fn prefix_contains_lowers_to_half_open_range() {
        let clause = WhereClause {
            field: "title".into(),
            op: WhereOp::PrefixContains,
            value: Bson::String("rus".into()),
        };

        let lowered = Predicate::lower(&clause);

        assert_eq!(lowered.len(), 2);
        assert_eq!(lowered[0], Predicate::new("title", FieldOp::Gte, "rus"));
        assert_eq!(lowered[1], Predicate::new("title", FieldOp::Lt, "rus\u{f8ff}"));
    }

    #[test]
    fn comparison_clauses_lower_directly() {
        let clause = WhereClause {
            field: "n".into(),
            op: WhereOp::LessThan,
            value: Bson::Int32(4),
        };

        assert_eq!(Predicate::lower(&clause), vec![Predicate::new("n", FieldOp::Lt, 4)]);
    }

    #[test]
    fn query_deserializes_from_json() {
        let query: QuerySpec = serde_json::from_value(serde_json::json!({
            "where": [{ "field": "status", "op": "equals", "value": "draft" }],
            "orderBy": [{ "field": "createdAt", "direction": "desc" }],
            "limit": 10
        }))
        .unwrap();

        assert_eq!(query.filters[0].op, WhereOp::Equals);
        assert_eq!(query.order_by[0].direction, SortDirection::Desc);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, None);
    }
}
