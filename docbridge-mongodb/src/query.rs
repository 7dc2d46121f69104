//! Translation of native predicates and sort keys into MongoDB syntax.

use bson::{Bson, Document, doc};

use docbridge_core::{
    error::DocumentStoreError,
    query::{FieldOp, OrderBy, Predicate, QueryVisitor, SortDirection},
    record::NATIVE_ID_FIELD,
};

use crate::sanitizer::ValueSanitizer;

/// Translates native predicates into MongoDB filter documents.
///
/// Field names are sanitized the same way stored keys are, so a predicate on a
/// dotted field name addresses the escaped key rather than a nested path.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Builds the filter for a conjunction of predicates.
    pub(crate) fn filter(predicates: &[Predicate]) -> Result<Document, DocumentStoreError> {
        MongoQueryTranslator.visit_and(predicates)
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, predicates: &[Predicate]) -> Result<Self::Output, Self::Error> {
        let mut clauses = predicates
            .iter()
            .map(|predicate| self.visit_predicate(predicate))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match clauses.len() {
            0 => doc! {},
            1 => clauses.remove(0),
            _ => doc! { "$and": clauses },
        })
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let key = ValueSanitizer::sanitize_string(field);
        let value = ValueSanitizer::sanitize_value(value);

        Ok(doc! {
            key: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
            }
        })
    }
}

/// Builds the sort document for `order_by`, with `_id` as the final tie-break.
pub(crate) fn sort_document(order_by: &[OrderBy]) -> Document {
    let mut sort = Document::new();

    for key in order_by {
        sort.insert(
            ValueSanitizer::sanitize_string(&key.field),
            match key.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            },
        );
    }

    if !sort.contains_key(NATIVE_ID_FIELD) {
        sort.insert(NATIVE_ID_FIELD, 1);
    }

    sort
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbridge_core::query::prefix_range;

    #[test]
    fn empty_conjunction_matches_everything() {
        assert_eq!(MongoQueryTranslator::filter(&[]).unwrap(), doc! {});
    }

    #[test]
    fn single_predicate_is_not_wrapped() {
        let filter = MongoQueryTranslator::filter(&[Predicate::new("status", FieldOp::Eq, "live")]).unwrap();

        assert_eq!(filter, doc! { "status": { "$eq": "live" } });
    }

    #[test]
    fn prefix_range_becomes_and_of_bounds() {
        let filter = MongoQueryTranslator::filter(&prefix_range("title", "ab")).unwrap();

        assert_eq!(filter, doc! {
            "$and": [
                { "title": { "$gte": "ab" } },
                { "title": { "$lt": "ab\u{f8ff}" } },
            ]
        });
    }

    #[test]
    fn dotted_field_names_are_escaped() {
        let filter = MongoQueryTranslator::filter(&[Predicate::new("a.b", FieldOp::Gt, 1)]).unwrap();

        assert_eq!(filter, doc! { "a__dot__b": { "$gt": 1 } });
    }

    #[test]
    fn sort_appends_id_tie_break() {
        let order = vec![
            OrderBy { field: "views".into(), direction: SortDirection::Desc },
            OrderBy { field: "title".into(), direction: SortDirection::Asc },
        ];

        let sort = sort_document(&order);

        assert_eq!(sort, doc! { "views": -1, "title": 1, "_id": 1 });
    }
}
