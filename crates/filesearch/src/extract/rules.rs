//! Rule-based extraction: temporal regexes plus a static type hint table.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ExtractionError;
use crate::hierarchy::TypeHierarchy;
use crate::temporal::extract_phrases_with_keywords;
use crate::types::{normalize_extension, FileTypeIndicator};

use super::{Extraction, ExtractionBackend};

type Hint = (&'static [&'static str], &'static [&'static str]);

// ---------------------------------------------------------------------------
// Hint tables
// ---------------------------------------------------------------------------

/// Broad categories. Always non-specific.
const CATEGORY_HINTS: &[Hint] = &[
    (
        &["image", "images", "photos", "picture", "pictures", "pics"],
        &["jpg", "jpeg", "png", "gif", "heic", "webp"],
    ),
    (
        &["video", "videos", "movie", "movies", "clips"],
        &["mp4", "mov", "m4v", "avi", "mkv"],
    ),
    (
        &["music", "audio", "song", "songs", "recordings"],
        &["mp3", "m4a", "wav", "flac", "aac"],
    ),
    (
        &["document", "documents", "docs"],
        &["pdf", "doc", "docx", "pages", "odt"],
    ),
    (
        &["spreadsheet", "spreadsheets", "sheets"],
        &["xlsx", "xls", "numbers", "ods"],
    ),
    (
        &["presentation", "presentations", "slides", "decks"],
        &["pptx", "ppt", "key", "odp"],
    ),
    (
        &["archive", "archives", "zips"],
        &["zip", "tar", "gz", "rar", "7z"],
    ),
    (
        &["code", "scripts", "sources"],
        &["py", "js", "ts", "rs", "go", "sh"],
    ),
];

/// Exact formats named in words. Always specific.
const FORMAT_HINTS: &[Hint] = &[
    (&["pdf", "pdfs"], &["pdf"]),
    (&["python"], &["py"]),
    (&["excel"], &["xlsx", "xls"]),
    (&["word"], &["docx", "doc"]),
    (&["powerpoint"], &["pptx", "ppt"]),
    (&["keynote"], &["key"]),
    (&["markdown"], &["md"]),
    (&["javascript"], &["js"]),
    (&["typescript"], &["ts"]),
    (&["rust"], &["rs"]),
    (&["jpeg", "jpegs"], &["jpg", "jpeg"]),
    (&["quicktime"], &["mov"]),
];

/// Extensions that read as ordinary English words; matched only when
/// written with a leading dot.
const AMBIGUOUS_EXTENSIONS: &[&str] = &["key", "log", "go", "pages", "numbers", "c", "h", "m"];

fn lookup(table: &'static [Hint], word: &str) -> Option<&'static [&'static str]> {
    table
        .iter()
        .find(|(words, _)| words.contains(&word))
        .map(|(_, extensions)| *extensions)
}

/// True when `word` names a broad category ("photos", "documents").
pub(crate) fn is_category_word(word: &str) -> bool {
    lookup(CATEGORY_HINTS, &word.trim().to_lowercase()).is_some()
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Deterministic extraction backend. Needs no network and never times out
/// in practice.
#[derive(Debug, Clone)]
pub struct RuleBasedExtractor {
    hierarchy: Arc<TypeHierarchy>,
}

impl Default for RuleBasedExtractor {
    fn default() -> Self {
        Self::new(TypeHierarchy::shared())
    }
}

impl RuleBasedExtractor {
    /// Bare extensions are recognized when `hierarchy` maps them.
    pub fn new(hierarchy: Arc<TypeHierarchy>) -> Self {
        Self { hierarchy }
    }

    /// File type indicators in text order, one per distinct token.
    pub fn file_types(&self, normalized: &str) -> Vec<FileTypeIndicator> {
        let mut seen = HashSet::new();
        let mut indicators = Vec::new();
        for raw in normalized.split_whitespace() {
            let token = raw.trim_matches(|ch: char| ch.is_ascii_punctuation() && ch != '.');
            let token = token.trim_end_matches('.');
            if token.is_empty() {
                continue;
            }
            let lower = token.to_lowercase();
            if !seen.insert(lower.clone()) {
                continue;
            }
            if let Some(indicator) = self.classify(token, &lower) {
                indicators.push(indicator);
            }
        }
        indicators
    }

    fn classify(&self, token: &str, lower: &str) -> Option<FileTypeIndicator> {
        if let Some(extensions) = lookup(CATEGORY_HINTS, lower) {
            return Some(FileTypeIndicator::new(token, extensions.iter(), false));
        }
        if let Some(extensions) = lookup(FORMAT_HINTS, lower) {
            return Some(FileTypeIndicator::new(token, extensions.iter(), true));
        }
        self.bare_extension(lower)
            .map(|extension| FileTypeIndicator::new(token, [extension], true))
    }

    /// `mp4`, `.xlsx`, and plural forms like `mp4s`.
    fn bare_extension(&self, lower: &str) -> Option<String> {
        let dotted = lower.starts_with('.');
        if !dotted && lower.contains('.') {
            return None;
        }
        let candidate = normalize_extension(lower)?;
        if !dotted && AMBIGUOUS_EXTENSIONS.contains(&candidate.as_str()) {
            return None;
        }
        if self.hierarchy.identifier_for_extension(&candidate).is_some() {
            return Some(candidate);
        }
        let singular = candidate.strip_suffix('s')?;
        if !dotted && AMBIGUOUS_EXTENSIONS.contains(&singular) {
            return None;
        }
        self.hierarchy
            .identifier_for_extension(singular)
            .map(|_| singular.to_string())
    }
}

impl ExtractionBackend for RuleBasedExtractor {
    fn name(&self) -> &'static str {
        "rule_based"
    }

    fn extract(&self, normalized: &str) -> Result<Extraction, ExtractionError> {
        Ok(Extraction {
            file_types: self.file_types(normalized),
            temporal: extract_phrases_with_keywords(normalized),
            claimed_spans: Vec::new(),
        })
    }
}
