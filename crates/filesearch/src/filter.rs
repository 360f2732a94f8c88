//! Composite filter construction and evaluation.
//!
//! A [`ParsedQuery`](crate::ParsedQuery) compiles to a [`CompositeFilter`]:
//! - file type indicators become an OR of content type predicates
//! - residual keywords become `content contains OR name contains`
//! - the first temporal phrase becomes a changed-after predicate
//!
//! The groups are joined with AND. When every group is empty the filter
//! falls back to a name match on the original query.

mod compile;
mod evaluate;
mod expression;
pub mod spotlight;

pub use compile::{compile, CompileOptions, FilterCompiler};
pub use expression::{CompositeFilter, FilterExpression, FilterPredicate, TextField};
