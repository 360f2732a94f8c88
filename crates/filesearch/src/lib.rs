//! Natural-language file search query interpretation.
//!
//! Turns a free-text query ("find my resume from 1 week ago") into:
//! - candidate file type filters, resolved against a type hierarchy
//! - an absolute time window
//! - residual keywords
//!
//! and evaluates the resulting composite filter against a metadata source
//! (Spotlight, an in-memory record set) or a vector index.

pub mod error;
pub mod extract;
pub mod filter;
pub mod hierarchy;
pub mod normalize;
pub mod postfilter;
pub mod search;
pub mod settings;
pub mod source;
pub mod temporal;
pub mod types;

// Re-export main types
pub use error::{ExtractionError, Result, SearchError};
pub use extract::{
    CompletionClient, CompletionRequest, Extraction, ExtractionBackend, ModelExtractor,
    QueryExtractor, RuleBasedExtractor, WorkedExample,
};
pub use filter::{compile, CompileOptions, CompositeFilter, FilterCompiler, FilterExpression};
pub use hierarchy::{TypeEntry, TypeHierarchy};
pub use normalize::normalize;
pub use postfilter::post_filter;
pub use search::{FileSearch, SearchOutcome};
pub use settings::{ExtractorKind, SearchSettings, SettingsStore};
pub use source::{MdfindSource, MemorySource, MetadataSource, ScoreOrder, VectorHit, VectorIndex};
pub use temporal::{extract_phrases, resolve};
pub use types::{DateRange, FileTypeIndicator, ParsedQuery, ResultRecord, TemporalPhrase, TimeUnit};
