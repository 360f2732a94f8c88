//! End-to-end query pipeline.
//!
//! raw query → [`normalize`] → [`QueryExtractor`] → [`FilterCompiler`] →
//! backend → [`post_filter`] (vector backends only).

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, SearchError};
use crate::extract::{CompletionClient, ModelExtractor, QueryExtractor, RuleBasedExtractor};
use crate::filter::{CompileOptions, CompositeFilter, FilterCompiler};
use crate::hierarchy::TypeHierarchy;
use crate::normalize::{normalize, remove_case_insensitive};
use crate::postfilter::post_filter;
use crate::settings::{ExtractorKind, SearchSettings, DEFAULT_MAX_RESULTS, DEFAULT_VECTOR_TOP_K};
use crate::source::{MetadataSource, VectorIndex};
use crate::temporal::extract_phrases_with_keywords;
use crate::types::{ParsedQuery, ResultRecord};

/// Everything produced for one query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub parsed: ParsedQuery,
    pub filter: CompositeFilter,
    pub records: Vec<ResultRecord>,
}

/// Query interpreter plus search orchestration. Holds only read-only state
/// and can be shared across threads.
#[derive(Debug, Clone)]
pub struct FileSearch {
    extractor: QueryExtractor,
    hierarchy: Arc<TypeHierarchy>,
    options: CompileOptions,
    scopes: Vec<PathBuf>,
    max_results: usize,
    vector_top_k: usize,
}

impl FileSearch {
    pub fn new(extractor: QueryExtractor) -> Self {
        Self {
            extractor,
            hierarchy: TypeHierarchy::shared(),
            options: CompileOptions::default(),
            scopes: Vec::new(),
            max_results: DEFAULT_MAX_RESULTS,
            vector_top_k: DEFAULT_VECTOR_TOP_K,
        }
    }

    /// Builds the pipeline described by `settings`. The model backend needs
    /// a completion client; the rule-based backend ignores it.
    pub fn from_settings(
        settings: &SearchSettings,
        client: Option<Arc<dyn CompletionClient>>,
    ) -> Result<Self> {
        settings.validate()?;
        let hierarchy = match settings.type_hierarchy_path.as_deref() {
            Some(path) => Arc::new(TypeHierarchy::load(path)?),
            None => TypeHierarchy::shared(),
        };
        let extractor = match settings.extractor {
            ExtractorKind::RuleBased => QueryExtractor::new(
                Arc::new(RuleBasedExtractor::new(Arc::clone(&hierarchy))),
                settings.extraction_timeout(),
            ),
            ExtractorKind::Model => {
                let client = client.ok_or_else(|| {
                    SearchError::Settings(
                        "model extractor requires a completion client".to_string(),
                    )
                })?;
                QueryExtractor::new(
                    Arc::new(ModelExtractor::new(client)),
                    settings.extraction_timeout(),
                )
            }
        };
        log::info!(
            "search pipeline ready extractor={} timeout={:?} types={}",
            extractor.backend_name(),
            extractor.timeout(),
            hierarchy.len()
        );

        Ok(Self {
            extractor,
            hierarchy,
            options: settings.compile_options(),
            scopes: settings.scopes.clone(),
            max_results: settings.max_results,
            vector_top_k: settings.vector_top_k,
        })
    }

    pub fn with_hierarchy(mut self, hierarchy: Arc<TypeHierarchy>) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn with_compile_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<PathBuf>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_vector_top_k(mut self, top_k: usize) -> Self {
        self.vector_top_k = top_k;
        self
    }

    pub fn extractor(&self) -> &QueryExtractor {
        &self.extractor
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    /// Normalizes and extracts. Never fails.
    pub fn parse(&self, query: &str) -> ParsedQuery {
        self.extractor.extract(&normalize(query), query)
    }

    pub fn compile(&self, parsed: &ParsedQuery, now: DateTime<Utc>) -> CompositeFilter {
        FilterCompiler::with_options(&self.hierarchy, self.options).compile(parsed, now)
    }

    /// Runs `query` against a metadata source.
    pub fn search(&self, query: &str, source: &dyn MetadataSource) -> Result<SearchOutcome> {
        self.search_at(query, source, Utc::now())
    }

    /// Like [`search`](Self::search) with an explicit reference time.
    pub fn search_at(
        &self,
        query: &str,
        source: &dyn MetadataSource,
        now: DateTime<Utc>,
    ) -> Result<SearchOutcome> {
        let parsed = self.parse(query);
        let filter = self.compile(&parsed, now);
        let records = source.query(&filter, &self.scopes, self.max_results)?;
        log::info!(
            "search finished source={} results={} fallback={}",
            source.name(),
            records.len(),
            filter.is_fallback()
        );
        Ok(SearchOutcome {
            parsed,
            filter,
            records,
        })
    }

    /// Runs `query` against a vector index, then applies the date range
    /// client-side.
    pub fn semantic_search(&self, query: &str, index: &dyn VectorIndex) -> Result<SearchOutcome> {
        self.semantic_search_at(query, index, Utc::now())
    }

    pub fn semantic_search_at(
        &self,
        query: &str,
        index: &dyn VectorIndex,
        now: DateTime<Utc>,
    ) -> Result<SearchOutcome> {
        let parsed = self.parse(query);
        let filter = self.compile(&parsed, now);
        let text = semantic_query_text(query);

        let hits = index.query(&text, self.vector_top_k)?;
        let hit_count = hits.len();
        let mut records = hits
            .into_iter()
            .filter_map(|hit| hit.into_record(&self.hierarchy))
            .collect::<Vec<_>>();
        if records.len() < hit_count {
            log::debug!("dropped vector hits without path count={}", hit_count - records.len());
        }

        let order = index.score_order();
        records.sort_by(|a, b| {
            order.compare(
                a.score.unwrap_or(f32::NAN),
                b.score.unwrap_or(f32::NAN),
            )
        });
        if let Some(range) = filter.date_range() {
            records = post_filter(records, range);
        }
        log::info!(
            "semantic search finished text={text:?} hits={hit_count} results={}",
            records.len()
        );
        Ok(SearchOutcome {
            parsed,
            filter,
            records,
        })
    }
}

/// The query with temporal phrases removed, for embedding lookup. Falls back
/// to the whole query when nothing else is left.
pub fn semantic_query_text(query: &str) -> String {
    let mut text = query.to_string();
    for phrase in extract_phrases_with_keywords(query) {
        text = remove_case_insensitive(&text, &phrase.text);
    }
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        query.trim().to_string()
    } else {
        text
    }
}
