//! Structured field extraction from normalized queries.
//!
//! One [`QueryExtractor`] drives exactly one [`ExtractionBackend`]. Every
//! backend call runs on a worker thread and is bounded by the extractor's
//! timeout; a timeout or backend failure degrades to a keyword-only
//! [`ParsedQuery`] instead of failing the search.

mod model;
mod rules;

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::ExtractionError;
use crate::normalize::residual_keywords;
use crate::types::{FileTypeIndicator, ParsedQuery, TemporalPhrase};

pub use model::{
    response_schema, worked_examples, CompletionClient, CompletionRequest, ModelExtractor,
    WorkedExample, EXTRACTION_INSTRUCTION,
};
pub use rules::RuleBasedExtractor;

pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(3);

/// Raw output of a backend, before residual keywords are computed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub file_types: Vec<FileTypeIndicator>,
    pub temporal: Vec<TemporalPhrase>,
    /// Additional query spans the backend consumed, beyond indicator and
    /// phrase texts.
    pub claimed_spans: Vec<String>,
}

impl Extraction {
    /// Every span that should not survive into the residual keywords.
    pub fn claimed(&self) -> Vec<&str> {
        self.file_types
            .iter()
            .map(|indicator| indicator.text.as_str())
            .chain(self.temporal.iter().map(|phrase| phrase.text.as_str()))
            .chain(self.claimed_spans.iter().map(String::as_str))
            .filter(|span| !span.trim().is_empty())
            .collect()
    }
}

/// A strategy that pulls file types and temporal phrases out of a
/// normalized query.
pub trait ExtractionBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn extract(&self, normalized: &str) -> Result<Extraction, ExtractionError>;
}

/// Timeout-bounded front end over a single backend.
#[derive(Clone)]
pub struct QueryExtractor {
    backend: Arc<dyn ExtractionBackend>,
    timeout: Duration,
}

impl std::fmt::Debug for QueryExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExtractor")
            .field("backend", &self.backend.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl QueryExtractor {
    pub fn new(backend: Arc<dyn ExtractionBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Rule-based extraction over the built-in type hierarchy.
    pub fn rule_based() -> Self {
        Self::new(
            Arc::new(RuleBasedExtractor::default()),
            DEFAULT_EXTRACTION_TIMEOUT,
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Extracts fields from `normalized`. Never fails: on timeout or
    /// backend error the full normalized text becomes the keyword set.
    pub fn extract(&self, normalized: &str, original: &str) -> ParsedQuery {
        if normalized.trim().is_empty() {
            return ParsedQuery::keyword_only(normalized, original);
        }

        match self.run_backend(normalized) {
            Ok(extraction) => {
                let residual = residual_keywords(normalized, &extraction.claimed());
                log::debug!(
                    "extracted query backend={} types={} temporal={} residual={:?}",
                    self.backend.name(),
                    extraction.file_types.len(),
                    extraction.temporal.len(),
                    residual
                );
                ParsedQuery {
                    file_types: extraction.file_types,
                    temporal: extraction.temporal,
                    residual_keywords: residual,
                    original_query: original.to_string(),
                }
            }
            Err(error) => {
                log::warn!(
                    "extraction failed, using keyword search backend={} error={error}",
                    self.backend.name()
                );
                ParsedQuery::keyword_only(normalized, original)
            }
        }
    }

    /// Runs the backend on a detached worker thread and waits at most
    /// `self.timeout`. A worker that outlives the deadline finishes on its
    /// own and its result is discarded.
    fn run_backend(&self, normalized: &str) -> Result<Extraction, ExtractionError> {
        let backend = Arc::clone(&self.backend);
        let input = normalized.to_string();
        let (tx, rx) = mpsc::channel();

        thread::Builder::new()
            .name("filesearch-extract".to_string())
            .spawn(move || {
                let _ = tx.send(backend.extract(&input));
            })
            .map_err(|error| {
                ExtractionError::Backend(format!("failed to spawn extraction worker: {error}"))
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ExtractionError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ExtractionError::Backend(
                "extraction worker terminated unexpectedly".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeUnit;
    use std::time::Instant;

    struct SleepyBackend(Duration);

    impl ExtractionBackend for SleepyBackend {
        fn name(&self) -> &'static str {
            "sleepy"
        }

        fn extract(&self, _normalized: &str) -> Result<Extraction, ExtractionError> {
            thread::sleep(self.0);
            Ok(Extraction::default())
        }
    }

    struct FailingBackend;

    impl ExtractionBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn extract(&self, _normalized: &str) -> Result<Extraction, ExtractionError> {
            Err(ExtractionError::Malformed("not json".to_string()))
        }
    }

    struct PanickingBackend;

    impl ExtractionBackend for PanickingBackend {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn extract(&self, _normalized: &str) -> Result<Extraction, ExtractionError> {
            panic!("backend bug");
        }
    }

    struct FixedBackend(Extraction);

    impl ExtractionBackend for FixedBackend {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn extract(&self, _normalized: &str) -> Result<Extraction, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn timeout_degrades_to_keyword_only() {
        let extractor = QueryExtractor::new(
            Arc::new(SleepyBackend(Duration::from_secs(5))),
            Duration::from_millis(50),
        );
        let started = Instant::now();
        let parsed = extractor.extract("asdkjasd", "asdkjasd");
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(parsed, ParsedQuery::keyword_only("asdkjasd", "asdkjasd"));
        assert!(parsed.file_types.is_empty());
        assert!(parsed.temporal.is_empty());
        assert_eq!(parsed.residual_keywords, "asdkjasd");
    }

    #[test]
    fn backend_error_degrades_to_keyword_only() {
        let extractor = QueryExtractor::new(Arc::new(FailingBackend), Duration::from_secs(1));
        let parsed = extractor.extract("resume pdf", "find my resume pdf");
        assert_eq!(parsed.residual_keywords, "resume pdf");
        assert_eq!(parsed.original_query, "find my resume pdf");
        assert!(parsed.file_types.is_empty());
    }

    #[test]
    fn worker_panic_degrades_to_keyword_only() {
        let extractor = QueryExtractor::new(Arc::new(PanickingBackend), Duration::from_secs(1));
        let parsed = extractor.extract("notes", "notes");
        assert_eq!(parsed, ParsedQuery::keyword_only("notes", "notes"));
    }

    #[test]
    fn keyword_only_fallback_keeps_short_tokens() {
        let extractor = QueryExtractor::new(Arc::new(FailingBackend), Duration::from_secs(1));
        let parsed = extractor.extract("q3 tax", "q3 tax");
        assert_eq!(parsed.residual_keywords, "q3 tax");
    }

    #[test]
    fn residual_excludes_claimed_spans() {
        let extraction = Extraction {
            file_types: vec![FileTypeIndicator::new("pdf", ["pdf"], true)],
            temporal: vec![TemporalPhrase {
                text: "1 week".to_string(),
                value: 1,
                unit: TimeUnit::Week,
                fuzzy: false,
            }],
            claimed_spans: Vec::new(),
        };
        let extractor =
            QueryExtractor::new(Arc::new(FixedBackend(extraction)), Duration::from_secs(1));
        let parsed = extractor.extract("resume pdf 1 week", "find my resume pdf from 1 week ago");
        assert_eq!(parsed.residual_keywords, "resume");
        assert_eq!(parsed.file_types.len(), 1);
        assert_eq!(parsed.temporal.len(), 1);
    }

    #[test]
    fn empty_input_skips_backend() {
        let extractor = QueryExtractor::new(
            Arc::new(SleepyBackend(Duration::from_secs(5))),
            Duration::from_millis(10),
        );
        let parsed = extractor.extract("   ", "the");
        assert_eq!(parsed.residual_keywords, "");
        assert_eq!(parsed.original_query, "the");
    }

    #[test]
    fn rule_based_defaults() {
        let extractor = QueryExtractor::rule_based().with_timeout(Duration::from_millis(750));
        assert_eq!(extractor.backend_name(), "rule_based");
        assert_eq!(extractor.timeout(), Duration::from_millis(750));
    }
}
