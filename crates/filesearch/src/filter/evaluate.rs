//! Client-side evaluation of a composite filter against result records.

use crate::types::ResultRecord;

use super::expression::{CompositeFilter, FilterExpression, FilterPredicate, TextField};

impl CompositeFilter {
    /// Evaluates the filter against a record.
    ///
    /// Text matching is case-insensitive. A record without a modification
    /// time never satisfies a date predicate.
    pub fn matches(&self, record: &ResultRecord) -> bool {
        evaluate_expression(self.expression(), record)
    }
}

fn evaluate_expression(expression: &FilterExpression, record: &ResultRecord) -> bool {
    match expression {
        FilterExpression::Predicate(predicate) => evaluate_predicate(predicate, record),
        FilterExpression::And(parts) => parts.iter().all(|part| evaluate_expression(part, record)),
        FilterExpression::Or(parts) => parts.iter().any(|part| evaluate_expression(part, record)),
    }
}

fn evaluate_predicate(predicate: &FilterPredicate, record: &ResultRecord) -> bool {
    match predicate {
        FilterPredicate::ContentType(id) => record.content_type_tree.iter().any(|item| item == id),
        FilterPredicate::TextContains { field, value } => {
            let haystack = match field {
                TextField::Content => record.text.as_deref(),
                TextField::Name => Some(record.name.as_str()),
            };
            haystack.is_some_and(|haystack| contains_ignore_case(haystack, value))
        }
        FilterPredicate::ChangedAfter(instant) => {
            record.modified_at.is_some_and(|modified| modified > *instant)
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
