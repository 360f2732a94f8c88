//! In-memory metadata source, optionally loaded from a JSON metadata dump.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SearchError};
use crate::filter::CompositeFilter;
use crate::hierarchy::TypeHierarchy;
use crate::types::ResultRecord;

use super::{in_scope, parse_timestamp, MetadataSource};

/// One item of a metadata dump.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DumpItem {
    path: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    creation_date: Option<String>,
    #[serde(default)]
    content_change_date: Option<String>,
}

impl DumpItem {
    fn into_record(self, hierarchy: &TypeHierarchy) -> ResultRecord {
        let mut record = ResultRecord::from_path(self.path);
        if let Some(name) = self.name.filter(|name| !name.is_empty()) {
            record.name = name;
        }

        record.content_type_tree = match self.content_type.as_deref() {
            Some(id) if hierarchy.contains(id) => hierarchy.content_type_tree(id),
            _ => record
                .extension()
                .map(|extension| hierarchy.tree_for_extension(&extension))
                .unwrap_or_default(),
        };
        record.modified_at = self.content_change_date.as_deref().and_then(parse_timestamp);
        record.created_at = self.creation_date.as_deref().and_then(parse_timestamp);

        if let Some(size) = self.size {
            record.metadata.insert("size".to_string(), size.to_string());
        }
        if let Some(content_type) = self.content_type {
            record.metadata.insert("content_type".to_string(), content_type);
        }
        if let Some(kind) = self.kind {
            record.metadata.insert("kind".to_string(), kind);
        }
        record
    }
}

/// Evaluates filters client-side over a fixed record set.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<ResultRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<ResultRecord>) -> Self {
        Self { records }
    }

    /// Parses a dump: a JSON array of objects with `Path`, `Name`, `Size`,
    /// `ContentType`, `Kind`, `CreationDate` and `ContentChangeDate` keys.
    ///
    /// `ContentType` may be a type identifier or a MIME type; when it is not
    /// a known identifier the type tree is derived from the extension.
    pub fn from_dump(raw: &str, hierarchy: &TypeHierarchy) -> Result<Self> {
        let items: Vec<DumpItem> = serde_json::from_str(raw)?;
        Ok(Self::new(
            items
                .into_iter()
                .map(|item| item.into_record(hierarchy))
                .collect(),
        ))
    }

    pub fn load_dump(path: &Path, hierarchy: &TypeHierarchy) -> Result<Self> {
        if !path.exists() {
            return Err(SearchError::PathNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let source = Self::from_dump(&raw, hierarchy)?;
        log::info!(
            "loaded metadata dump path={} records={}",
            path.display(),
            source.len()
        );
        Ok(source)
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl MetadataSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn query(
        &self,
        filter: &CompositeFilter,
        scopes: &[PathBuf],
        max_results: usize,
    ) -> Result<Vec<ResultRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|record| in_scope(&record.path, scopes) && filter.matches(record))
            .take(max_results)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterCompiler;
    use crate::types::ParsedQuery;
    use chrono::Utc;
    use std::io::Write;

    const DUMP: &str = r#"[
        {
            "Path": "/Users/ana/Documents/resume.pdf",
            "Name": "resume.pdf",
            "Size": 48213,
            "ContentType": "com.adobe.pdf",
            "Kind": "PDF document",
            "CreationDate": "2024-01-02T09:00:00Z",
            "ContentChangeDate": "2024-03-04T10:00:00Z"
        },
        {
            "Path": "/home/ana/Pictures/beach.jpg",
            "Name": "beach.jpg",
            "Size": 1024,
            "ContentType": "image/jpeg",
            "Kind": "jpeg",
            "CreationDate": "2024-05-01T08:00:00",
            "ContentChangeDate": "2024-05-01T08:00:00"
        },
        { "Path": "/tmp/notes" }
    ]"#;

    #[test]
    fn parses_dump_items() {
        let source = MemorySource::from_dump(DUMP, TypeHierarchy::builtin()).expect("dump");
        assert_eq!(source.len(), 3);

        let pdf = &source.records()[0];
        assert_eq!(pdf.name, "resume.pdf");
        assert_eq!(
            pdf.content_type_tree.first().map(String::as_str),
            Some("com.adobe.pdf")
        );
        assert_eq!(pdf.metadata.get("size").map(String::as_str), Some("48213"));
        assert_eq!(pdf.metadata.get("kind").map(String::as_str), Some("PDF document"));
        assert!(pdf.modified_at.is_some());

        let jpg = &source.records()[1];
        assert!(jpg.content_type_tree.iter().any(|id| id == "public.image"));
        assert!(jpg.created_at.is_some());

        let bare = &source.records()[2];
        assert_eq!(bare.name, "notes");
        assert!(bare.content_type_tree.is_empty());
        assert!(bare.modified_at.is_none());
    }

    #[test]
    fn query_applies_filter_scope_and_limit() {
        let source = MemorySource::from_dump(DUMP, TypeHierarchy::builtin()).expect("dump");
        let compiler = FilterCompiler::new(TypeHierarchy::builtin());

        let everything = compiler.compile(&ParsedQuery::keyword_only("e", "e"), Utc::now());
        let all = source.query(&everything, &[], 10).expect("query");
        assert_eq!(all.len(), 3);

        let limited = source.query(&everything, &[], 1).expect("query");
        assert_eq!(limited.len(), 1);

        let scoped = source
            .query(&everything, &[PathBuf::from("/home/ana")], 10)
            .expect("query");
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].name, "beach.jpg");
    }

    #[test]
    fn load_dump_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(DUMP.as_bytes()).expect("write dump");
        let source = MemorySource::load_dump(file.path(), TypeHierarchy::builtin()).expect("load");
        assert_eq!(source.len(), 3);
    }

    #[test]
    fn load_dump_reports_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("missing.json");
        let error = MemorySource::load_dump(&missing, TypeHierarchy::builtin()).expect_err("missing");
        assert!(matches!(error, SearchError::PathNotFound(_)));
    }

    #[test]
    fn malformed_dump_is_a_serialization_error() {
        let error = MemorySource::from_dump("{\"Path\": 1}", TypeHierarchy::builtin())
            .expect_err("malformed");
        assert!(matches!(error, SearchError::Serialization(_)));
    }
}
