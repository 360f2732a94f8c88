//! Composite filter expression types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DateRange;

/// A node of the filter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterExpression {
    Predicate(FilterPredicate),
    And(Vec<FilterExpression>),
    Or(Vec<FilterExpression>),
}

/// Record field targeted by a text predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    /// Indexed body text.
    Content,
    /// File name.
    Name,
}

/// An atomic constraint (leaf node).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPredicate {
    /// The item's content type tree contains this identifier.
    ContentType(String),
    /// Case-insensitive substring match on a field.
    TextContains { field: TextField, value: String },
    /// Content last changed strictly after this instant.
    ChangedAfter(DateTime<Utc>),
}

impl FilterExpression {
    pub fn predicate(predicate: FilterPredicate) -> Self {
        Self::Predicate(predicate)
    }

    /// Collapses single-member groups; an empty list yields `None`.
    pub fn all_of(mut parts: Vec<FilterExpression>) -> Option<Self> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Self::And(parts)),
        }
    }

    /// Collapses single-member groups; an empty list yields `None`.
    pub fn any_of(mut parts: Vec<FilterExpression>) -> Option<Self> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Self::Or(parts)),
        }
    }

    /// Leaf predicates in depth-first order.
    pub fn predicates(&self) -> Vec<&FilterPredicate> {
        let mut leaves = Vec::new();
        collect_predicates(self, &mut leaves);
        leaves
    }
}

fn collect_predicates<'a>(expression: &'a FilterExpression, leaves: &mut Vec<&'a FilterPredicate>) {
    match expression {
        FilterExpression::Predicate(predicate) => leaves.push(predicate),
        FilterExpression::And(parts) | FilterExpression::Or(parts) => {
            for part in parts {
                collect_predicates(part, leaves);
            }
        }
    }
}

/// The compiled filter for one query.
///
/// Carries the full resolved date range next to the expression: the
/// expression only encodes the range start, and post-filtering needs both
/// bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeFilter {
    expression: FilterExpression,
    date_range: Option<DateRange>,
    fallback: bool,
}

impl CompositeFilter {
    pub(crate) fn new(
        expression: FilterExpression,
        date_range: Option<DateRange>,
        fallback: bool,
    ) -> Self {
        Self {
            expression,
            date_range,
            fallback,
        }
    }

    pub fn expression(&self) -> &FilterExpression {
        &self.expression
    }

    pub fn date_range(&self) -> Option<&DateRange> {
        self.date_range.as_ref()
    }

    /// True when nothing usable was extracted and the filter is the
    /// name-contains fallback.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Content type identifiers referenced by the filter.
    pub fn content_types(&self) -> Vec<&str> {
        self.expression
            .predicates()
            .into_iter()
            .filter_map(|predicate| match predicate {
                FilterPredicate::ContentType(id) => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(value: &str) -> FilterExpression {
        FilterExpression::predicate(FilterPredicate::TextContains {
            field: TextField::Name,
            value: value.to_string(),
        })
    }

    #[test]
    fn groups_collapse_singletons() {
        assert_eq!(FilterExpression::all_of(Vec::new()), None);
        assert_eq!(FilterExpression::any_of(vec![name("a")]), Some(name("a")));
        assert_eq!(
            FilterExpression::any_of(vec![name("a"), name("b")]),
            Some(FilterExpression::Or(vec![name("a"), name("b")]))
        );
    }

    #[test]
    fn predicates_are_listed_depth_first() {
        let expression = FilterExpression::And(vec![
            FilterExpression::Or(vec![name("a"), name("b")]),
            name("c"),
        ]);
        let values = expression
            .predicates()
            .into_iter()
            .map(|predicate| match predicate {
                FilterPredicate::TextContains { value, .. } => value.as_str(),
                _ => "",
            })
            .collect::<Vec<_>>();
        assert_eq!(values, vec!["a", "b", "c"]);
    }
}
