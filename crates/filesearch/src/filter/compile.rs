//! Compilation of a parsed query into a composite filter.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hierarchy::TypeHierarchy;
use crate::temporal::{resolve_phrase, DEFAULT_FUZZY_HALF_WIDTH};
use crate::types::{FileTypeIndicator, ParsedQuery};

use super::expression::{CompositeFilter, FilterExpression, FilterPredicate, TextField};

/// Tunables for filter compilation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// How many parents a broad category climbs from its leaf type.
    pub category_climb_levels: usize,
    /// Half width of fuzzy date windows, as a fraction of the magnitude.
    pub fuzzy_half_width: f64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            category_climb_levels: 1,
            fuzzy_half_width: DEFAULT_FUZZY_HALF_WIDTH,
        }
    }
}

/// Compiles parsed queries against a type hierarchy.
#[derive(Debug, Clone, Copy)]
pub struct FilterCompiler<'h> {
    hierarchy: &'h TypeHierarchy,
    options: CompileOptions,
}

impl<'h> FilterCompiler<'h> {
    pub fn new(hierarchy: &'h TypeHierarchy) -> Self {
        Self::with_options(hierarchy, CompileOptions::default())
    }

    pub fn with_options(hierarchy: &'h TypeHierarchy, options: CompileOptions) -> Self {
        Self { hierarchy, options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compiles a parsed query. Always yields a filter: when nothing usable
    /// was extracted the result matches names containing the original query.
    pub fn compile(&self, parsed: &ParsedQuery, now: DateTime<Utc>) -> CompositeFilter {
        let mut parts = Vec::new();

        let type_predicates = self
            .resolve_type_identifiers(&parsed.file_types)
            .into_iter()
            .map(|id| FilterExpression::predicate(FilterPredicate::ContentType(id)))
            .collect::<Vec<_>>();
        if let Some(types) = FilterExpression::any_of(type_predicates) {
            parts.push(types);
        }

        let keywords = parsed.residual_keywords.trim();
        if !keywords.is_empty() {
            parts.push(FilterExpression::Or(vec![
                text_contains(TextField::Content, keywords),
                text_contains(TextField::Name, keywords),
            ]));
        }

        let date_range = parsed
            .first_temporal()
            .map(|phrase| resolve_phrase(phrase, now, self.options.fuzzy_half_width));
        if let Some(range) = date_range.as_ref() {
            parts.push(FilterExpression::predicate(FilterPredicate::ChangedAfter(
                range.start,
            )));
        }

        match FilterExpression::all_of(parts) {
            Some(expression) => CompositeFilter::new(expression, date_range, false),
            None => {
                log::debug!(
                    "no usable predicate extracted, falling back to name match query={:?}",
                    parsed.original_query
                );
                CompositeFilter::new(
                    text_contains(TextField::Name, parsed.original_query.trim()),
                    None,
                    true,
                )
            }
        }
    }

    /// Maps indicators to type identifiers.
    ///
    /// Specific indicators keep their leaf type. Broad categories climb
    /// `category_climb_levels` parents. Unmapped extensions are dropped.
    pub fn resolve_type_identifiers(&self, indicators: &[FileTypeIndicator]) -> BTreeSet<String> {
        let mut identifiers = BTreeSet::new();
        for indicator in indicators {
            for extension in &indicator.extensions {
                let Some(leaf) = self.hierarchy.identifier_for_extension(extension) else {
                    log::debug!(
                        "dropping unmapped extension ext={extension} indicator={:?}",
                        indicator.text
                    );
                    continue;
                };
                let id = if indicator.specific {
                    leaf
                } else {
                    self.hierarchy
                        .ancestor(leaf, self.options.category_climb_levels)
                };
                identifiers.insert(id.to_string());
            }
        }
        identifiers
    }
}

fn text_contains(field: TextField, value: &str) -> FilterExpression {
    FilterExpression::predicate(FilterPredicate::TextContains {
        field,
        value: value.to_string(),
    })
}

/// Compiles with the current time and default options.
pub fn compile(parsed: &ParsedQuery, hierarchy: &TypeHierarchy) -> CompositeFilter {
    FilterCompiler::new(hierarchy).compile(parsed, Utc::now())
}
