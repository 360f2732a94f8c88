//! Content type hierarchy: type identifiers, their extensions, and parents.
//!
//! Identifiers follow the uniform type identifier naming used by Spotlight
//! (`public.jpeg` conforms to `public.image`, which conforms to
//! `public.content`). The table is read-only once built and is shared by all
//! searches.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::types::normalize_extension;

/// Upper bound on ancestor walks, guarding against cycles in custom tables.
const MAX_TREE_DEPTH: usize = 32;

/// One node of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub id: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TypeTable {
    types: Vec<TypeEntry>,
}

/// Mapping from type identifiers to member extensions and parent identifiers.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    entries: BTreeMap<String, TypeEntry>,
    by_extension: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Built-in table
// ---------------------------------------------------------------------------

type BuiltinType = (&'static str, Option<&'static str>, &'static [&'static str]);

const ROOT_TYPES: &[BuiltinType] = &[
    ("public.item", None, &[]),
    ("public.content", Some("public.item"), &[]),
    ("public.data", Some("public.item"), &[]),
    ("public.audiovisual-content", Some("public.content"), &[]),
    ("public.composite-content", Some("public.content"), &[]),
];

const IMAGE_TYPES: &[BuiltinType] = &[
    ("public.image", Some("public.content"), &[]),
    ("public.jpeg", Some("public.image"), &["jpg", "jpeg"]),
    ("public.png", Some("public.image"), &["png"]),
    ("com.compuserve.gif", Some("public.image"), &["gif"]),
    ("com.microsoft.bmp", Some("public.image"), &["bmp"]),
    ("public.tiff", Some("public.image"), &["tif", "tiff"]),
    ("public.svg-image", Some("public.image"), &["svg"]),
    ("org.webmproject.webp", Some("public.image"), &["webp"]),
    ("com.microsoft.ico", Some("public.image"), &["ico"]),
    ("public.heic", Some("public.image"), &["heic", "heif"]),
    ("com.adobe.photoshop-image", Some("public.image"), &["psd"]),
];

const MOVIE_TYPES: &[BuiltinType] = &[
    ("public.movie", Some("public.audiovisual-content"), &[]),
    ("public.mpeg-4", Some("public.movie"), &["mp4"]),
    ("com.apple.m4v-video", Some("public.movie"), &["m4v"]),
    ("com.apple.quicktime-movie", Some("public.movie"), &["mov"]),
    ("public.avi", Some("public.movie"), &["avi"]),
    ("org.matroska.mkv", Some("public.movie"), &["mkv"]),
    ("com.microsoft.windows-media-wmv", Some("public.movie"), &["wmv"]),
    ("com.adobe.flash.video", Some("public.movie"), &["flv"]),
    ("org.webmproject.webm", Some("public.movie"), &["webm"]),
    ("public.mpeg", Some("public.movie"), &["mpg", "mpeg"]),
];

const AUDIO_TYPES: &[BuiltinType] = &[
    ("public.audio", Some("public.audiovisual-content"), &[]),
    ("public.mp3", Some("public.audio"), &["mp3"]),
    ("com.microsoft.waveform-audio", Some("public.audio"), &["wav"]),
    ("org.xiph.flac", Some("public.audio"), &["flac"]),
    ("public.aac-audio", Some("public.audio"), &["aac"]),
    ("org.xiph.ogg-audio", Some("public.audio"), &["ogg", "oga"]),
    ("com.microsoft.windows-media-wma", Some("public.audio"), &["wma"]),
    ("com.apple.m4a-audio", Some("public.audio"), &["m4a"]),
    ("org.xiph.opus", Some("public.audio"), &["opus"]),
    ("public.aiff-audio", Some("public.audio"), &["aiff", "aif"]),
];

const TEXT_TYPES: &[BuiltinType] = &[
    ("public.text", Some("public.content"), &[]),
    ("public.plain-text", Some("public.text"), &["txt", "log", "rst"]),
    ("net.daringfireball.markdown", Some("public.text"), &["md", "markdown"]),
    ("public.rtf", Some("public.text"), &["rtf"]),
    ("public.html", Some("public.text"), &["html", "htm", "xhtml"]),
    ("public.source-code", Some("public.plain-text"), &[]),
    ("public.python-script", Some("public.source-code"), &["py"]),
    ("com.netscape.javascript-source", Some("public.source-code"), &["js", "mjs", "jsx"]),
    ("com.microsoft.typescript", Some("public.source-code"), &["ts", "tsx"]),
    ("public.c-source", Some("public.source-code"), &["c", "h"]),
    ("public.c-plus-plus-source", Some("public.source-code"), &["cpp", "cc", "cxx", "hpp"]),
    ("com.sun.java-source", Some("public.source-code"), &["java"]),
    ("org.golang.go-source", Some("public.source-code"), &["go"]),
    ("public.rust-source", Some("public.source-code"), &["rs"]),
    ("public.ruby-script", Some("public.source-code"), &["rb"]),
    ("public.php-script", Some("public.source-code"), &["php"]),
    ("public.swift-source", Some("public.source-code"), &["swift"]),
    ("public.shell-script", Some("public.source-code"), &["sh", "bash", "zsh"]),
    ("org.jupyter.ipynb", Some("public.source-code"), &["ipynb"]),
];

const DOCUMENT_TYPES: &[BuiltinType] = &[
    ("com.adobe.pdf", Some("public.composite-content"), &["pdf"]),
    ("com.microsoft.word.doc", Some("public.composite-content"), &["doc"]),
    (
        "org.openxmlformats.wordprocessingml.document",
        Some("public.composite-content"),
        &["docx"],
    ),
    ("org.oasis-open.opendocument.text", Some("public.composite-content"), &["odt"]),
    ("com.apple.iwork.pages.pages", Some("public.composite-content"), &["pages"]),
    ("public.spreadsheet", Some("public.composite-content"), &[]),
    ("com.microsoft.excel.xls", Some("public.spreadsheet"), &["xls"]),
    ("org.openxmlformats.spreadsheetml.sheet", Some("public.spreadsheet"), &["xlsx"]),
    ("public.comma-separated-values-text", Some("public.spreadsheet"), &["csv"]),
    ("org.oasis-open.opendocument.spreadsheet", Some("public.spreadsheet"), &["ods"]),
    ("com.apple.iwork.numbers.numbers", Some("public.spreadsheet"), &["numbers"]),
    ("public.presentation", Some("public.composite-content"), &[]),
    ("com.microsoft.powerpoint.ppt", Some("public.presentation"), &["ppt"]),
    (
        "org.openxmlformats.presentationml.presentation",
        Some("public.presentation"),
        &["pptx"],
    ),
    ("org.oasis-open.opendocument.presentation", Some("public.presentation"), &["odp"]),
    ("com.apple.iwork.keynote.key", Some("public.presentation"), &["key"]),
];

const ARCHIVE_TYPES: &[BuiltinType] = &[
    ("public.archive", Some("public.data"), &[]),
    ("public.zip-archive", Some("public.archive"), &["zip"]),
    ("public.tar-archive", Some("public.archive"), &["tar"]),
    ("org.gnu.gnu-zip-archive", Some("public.archive"), &["gz", "tgz"]),
    ("com.rarlab.rar-archive", Some("public.archive"), &["rar"]),
    ("org.7-zip.7-zip-archive", Some("public.archive"), &["7z"]),
    ("public.bzip2-archive", Some("public.archive"), &["bz2"]),
    ("org.tukaani.xz-archive", Some("public.archive"), &["xz"]),
    ("com.apple.disk-image", Some("public.archive"), &["dmg"]),
    ("public.iso-image", Some("public.archive"), &["iso"]),
];

fn builtin_entries() -> impl Iterator<Item = TypeEntry> {
    [
        ROOT_TYPES,
        IMAGE_TYPES,
        MOVIE_TYPES,
        AUDIO_TYPES,
        TEXT_TYPES,
        DOCUMENT_TYPES,
        ARCHIVE_TYPES,
    ]
    .into_iter()
    .flatten()
    .map(|(id, parent, extensions)| TypeEntry {
        id: (*id).to_string(),
        parent: parent.map(str::to_string),
        extensions: extensions.iter().map(|ext| (*ext).to_string()).collect(),
    })
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

impl TypeHierarchy {
    /// The process-wide built-in table, built on first use.
    pub fn builtin() -> &'static TypeHierarchy {
        Self::builtin_shared().as_ref()
    }

    fn builtin_shared() -> &'static Arc<TypeHierarchy> {
        static BUILTIN: OnceLock<Arc<TypeHierarchy>> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let mut hierarchy = TypeHierarchy::default();
            for entry in builtin_entries() {
                hierarchy.insert(entry);
            }
            Arc::new(hierarchy)
        })
    }

    /// A handle to the built-in table. Every call shares one allocation.
    pub fn shared() -> Arc<TypeHierarchy> {
        Arc::clone(Self::builtin_shared())
    }

    /// Builds a hierarchy from entries, rejecting dangling parents.
    pub fn from_entries<I: IntoIterator<Item = TypeEntry>>(entries: I) -> Result<Self> {
        let mut hierarchy = TypeHierarchy::default();
        for entry in entries {
            if entry.id.trim().is_empty() {
                return Err(SearchError::Hierarchy(
                    "type identifier must not be empty".to_string(),
                ));
            }
            if hierarchy.entries.contains_key(&entry.id) {
                return Err(SearchError::Hierarchy(format!(
                    "duplicate type identifier: {}",
                    entry.id
                )));
            }
            hierarchy.insert(entry);
        }
        for entry in hierarchy.entries.values() {
            if let Some(parent) = entry.parent.as_deref() {
                if !hierarchy.entries.contains_key(parent) {
                    return Err(SearchError::Hierarchy(format!(
                        "type {} has unknown parent {parent}",
                        entry.id
                    )));
                }
            }
        }
        Ok(hierarchy)
    }

    /// Parses a JSON table of the form `{"types": [{"id", "parent", "extensions"}]}`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let table: TypeTable = serde_json::from_str(raw)?;
        Self::from_entries(table.types)
    }

    /// Loads a JSON table from disk.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SearchError::PathNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    fn insert(&mut self, mut entry: TypeEntry) {
        entry.extensions = entry
            .extensions
            .iter()
            .filter_map(|ext| normalize_extension(ext))
            .collect();
        for extension in &entry.extensions {
            // First declaration wins, so a table can list an extension under
            // its most common type first.
            self.by_extension
                .entry(extension.clone())
                .or_insert_with(|| entry.id.clone());
        }
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Leaf identifier for an extension (case-insensitive, leading dot ignored).
    pub fn identifier_for_extension(&self, extension: &str) -> Option<&str> {
        let normalized = normalize_extension(extension)?;
        self.by_extension.get(&normalized).map(String::as_str)
    }

    pub fn parent(&self, id: &str) -> Option<&str> {
        self.entries.get(id)?.parent.as_deref()
    }

    /// Extensions declared directly on a type.
    pub fn extensions(&self, id: &str) -> &[String] {
        self.entries
            .get(id)
            .map(|entry| entry.extensions.as_slice())
            .unwrap_or_default()
    }

    /// Walks up to `levels` parents; stops early at a root.
    pub fn ancestor<'a>(&'a self, id: &'a str, levels: usize) -> &'a str {
        let mut current = id;
        for _ in 0..levels.min(MAX_TREE_DEPTH) {
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// The identifier followed by all of its ancestors.
    pub fn content_type_tree(&self, id: &str) -> Vec<String> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut tree = vec![id.to_string()];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if tree.len() >= MAX_TREE_DEPTH || tree.iter().any(|seen| seen == parent) {
                break;
            }
            tree.push(parent.to_string());
            current = parent;
        }
        tree
    }

    /// Content type tree for a file extension; empty when unmapped.
    pub fn tree_for_extension(&self, extension: &str) -> Vec<String> {
        self.identifier_for_extension(extension)
            .map(|id| self.content_type_tree(id))
            .unwrap_or_default()
    }

    /// Returns true when `id` equals `ancestor` or descends from it.
    pub fn conforms_to(&self, id: &str, ancestor: &str) -> bool {
        self.content_type_tree(id).iter().any(|item| item == ancestor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_maps_extensions_to_leaves() {
        let hierarchy = TypeHierarchy::builtin();
        assert_eq!(hierarchy.identifier_for_extension("pdf"), Some("com.adobe.pdf"));
        assert_eq!(hierarchy.identifier_for_extension(".JPG"), Some("public.jpeg"));
        assert_eq!(hierarchy.identifier_for_extension("jpeg"), Some("public.jpeg"));
        assert_eq!(hierarchy.identifier_for_extension("unknownext"), None);
    }

    #[test]
    fn shared_handles_point_at_one_table() {
        let first = TypeHierarchy::shared();
        let second = TypeHierarchy::shared();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(std::ptr::eq(first.as_ref(), TypeHierarchy::builtin()));
    }

    #[test]
    fn builtin_parents_are_declared() {
        let hierarchy = TypeHierarchy::builtin();
        let rebuilt = TypeHierarchy::from_entries(builtin_entries()).expect("valid builtin table");
        assert_eq!(rebuilt.len(), hierarchy.len());
    }

    #[test]
    fn ancestor_climbs_one_level() {
        let hierarchy = TypeHierarchy::builtin();
        assert_eq!(hierarchy.ancestor("public.png", 1), "public.image");
        assert_eq!(hierarchy.ancestor("com.adobe.pdf", 1), "public.composite-content");
        assert_eq!(hierarchy.ancestor("public.png", 0), "public.png");
        assert_eq!(hierarchy.ancestor("public.item", 3), "public.item");
    }

    #[test]
    fn content_type_tree_lists_ancestors() {
        let hierarchy = TypeHierarchy::builtin();
        assert_eq!(
            hierarchy.tree_for_extension("py"),
            vec![
                "public.python-script",
                "public.source-code",
                "public.plain-text",
                "public.text",
                "public.content",
                "public.item",
            ]
        );
        assert!(hierarchy.conforms_to("public.mp3", "public.audiovisual-content"));
        assert!(!hierarchy.conforms_to("public.mp3", "public.movie"));
    }

    #[test]
    fn json_table_round_trips_lookups() {
        let hierarchy = TypeHierarchy::from_json(
            r#"{"types": [
                {"id": "root"},
                {"id": "vector", "parent": "root"},
                {"id": "svg", "parent": "vector", "extensions": ["SVG", ".svgz"]}
            ]}"#,
        )
        .expect("parse");
        assert_eq!(hierarchy.identifier_for_extension("svgz"), Some("svg"));
        assert_eq!(hierarchy.ancestor("svg", 1), "vector");
        assert_eq!(hierarchy.extensions("svg"), ["svg", "svgz"]);
    }

    #[test]
    fn rejects_dangling_parent_and_duplicates() {
        let dangling = TypeHierarchy::from_json(r#"{"types": [{"id": "a", "parent": "b"}]}"#);
        assert!(matches!(dangling, Err(SearchError::Hierarchy(_))));
        let duplicate = TypeHierarchy::from_json(r#"{"types": [{"id": "a"}, {"id": "a"}]}"#);
        assert!(matches!(duplicate, Err(SearchError::Hierarchy(_))));
    }

    #[test]
    fn cyclic_tables_terminate() {
        let hierarchy = TypeHierarchy::from_json(
            r#"{"types": [{"id": "a", "parent": "b"}, {"id": "b", "parent": "a"}]}"#,
        )
        .expect("parse");
        assert_eq!(hierarchy.content_type_tree("a"), vec!["a", "b"]);
        assert_eq!(hierarchy.ancestor("a", 100), "a");
    }

    #[test]
    fn load_reports_missing_file() {
        let result = TypeHierarchy::load(Path::new("/nonexistent/types.json"));
        assert!(matches!(result, Err(SearchError::PathNotFound(_))));
    }
}
