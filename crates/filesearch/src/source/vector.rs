//! Vector index seam and hit normalization.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hierarchy::TypeHierarchy;
use crate::types::ResultRecord;

use super::parse_timestamp;

/// How a vector index orders its scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrder {
    /// Distances: smaller is closer.
    #[default]
    LowerIsBetter,
    /// Similarities: larger is closer.
    HigherIsBetter,
}

impl ScoreOrder {
    /// Orders `a` before `b` when `a` is the better score.
    pub fn compare(self, a: f32, b: f32) -> Ordering {
        let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            Self::LowerIsBetter => ordering,
            Self::HigherIsBetter => ordering.reverse(),
        }
    }
}

/// One hit from a vector index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub score: f32,
    #[serde(default)]
    pub text: Option<String>,
    /// Indexed metadata; `path`, `modification_date` and `creation_date`
    /// are understood.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl VectorHit {
    /// Normalizes the hit. Hits without a `path` entry cannot be shown and
    /// yield `None`.
    pub fn into_record(mut self, hierarchy: &TypeHierarchy) -> Option<ResultRecord> {
        let path = self.metadata.remove("path").filter(|path| !path.is_empty())?;
        let mut record = ResultRecord::from_path(path);
        if let Some(name) = self.metadata.remove("name").filter(|name| !name.is_empty()) {
            record.name = name;
        }
        if let Some(extension) = record.extension() {
            record.content_type_tree = hierarchy.tree_for_extension(&extension);
        }
        record.modified_at = self
            .metadata
            .get("modification_date")
            .and_then(|raw| parse_timestamp(raw));
        record.created_at = self
            .metadata
            .get("creation_date")
            .and_then(|raw| parse_timestamp(raw));
        record.text = self.text;
        record.score = Some(self.score);
        record.metadata = self.metadata;
        Some(record)
    }
}

/// Semantic retrieval over an external embedding store.
pub trait VectorIndex: Send + Sync {
    /// Top `k` hits for `text`, in any order.
    fn query(&self, text: &str, k: usize) -> Result<Vec<VectorHit>>;

    fn score_order(&self) -> ScoreOrder {
        ScoreOrder::LowerIsBetter
    }
}
