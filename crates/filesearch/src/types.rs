//! Core types shared by the extractor, compiler, and search backends.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit of a relative time phrase.
///
/// Month and year are fixed approximations (30 and 365 days), not calendar
/// accurate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Length of one unit in seconds.
    pub fn seconds(self) -> i64 {
        const DAY: i64 = 86_400;
        match self {
            Self::Hour => 3_600,
            Self::Day => DAY,
            Self::Week => 7 * DAY,
            Self::Month => 30 * DAY,
            Self::Year => 365 * DAY,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    /// Accepts singular and plural forms, case-insensitively.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lower = value.trim().to_ascii_lowercase();
        let singular = lower.strip_suffix('s').unwrap_or(lower.as_str());
        match singular {
            "hour" | "hr" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" | "wk" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" | "yr" => Ok(Self::Year),
            _ => Err(format!("unknown time unit: {value:?}")),
        }
    }
}

/// A relative time expression found in a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalPhrase {
    /// The substring of the query that produced this phrase.
    pub text: String,
    pub value: u32,
    pub unit: TimeUnit,
    /// Set when an approximation word ("about", "roughly") qualified the phrase.
    pub fuzzy: bool,
}

/// An absolute time window. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a range, swapping the bounds if they are given out of order.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// A file type mention extracted from a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTypeIndicator {
    /// The query text that named the type ("pdf", "photos").
    pub text: String,
    /// Candidate extensions, lowercase without a leading dot.
    pub extensions: BTreeSet<String>,
    /// True for an exact format, false for a broad category.
    pub specific: bool,
}

impl FileTypeIndicator {
    pub fn new<I, S>(text: impl Into<String>, extensions: I, specific: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            text: text.into(),
            extensions: extensions
                .into_iter()
                .filter_map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
            specific,
        }
    }
}

/// Canonical extractor output, independent of the backend that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub file_types: Vec<FileTypeIndicator>,
    pub temporal: Vec<TemporalPhrase>,
    pub residual_keywords: String,
    pub original_query: String,
}

impl ParsedQuery {
    /// The degraded form used when extraction fails or times out.
    pub fn keyword_only(normalized: &str, original: &str) -> Self {
        Self {
            file_types: Vec::new(),
            temporal: Vec::new(),
            residual_keywords: normalized.trim().to_string(),
            original_query: original.to_string(),
        }
    }

    /// Only the first phrase is used for date filtering.
    pub fn first_temporal(&self) -> Option<&TemporalPhrase> {
        self.temporal.first()
    }
}

/// A search result, normalized from whatever shape the backend returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub path: String,
    pub name: String,
    /// Type identifiers from most specific to most general.
    #[serde(default)]
    pub content_type_tree: Vec<String>,
    /// Indexed text content, when the backend provides it.
    #[serde(default)]
    pub text: Option<String>,
    /// Relevance score; its ordering is backend-defined.
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ResultRecord {
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = name_of_path(&path).to_string();
        Self {
            path,
            name,
            ..Self::default()
        }
    }

    /// Lowercase extension of the record name.
    pub fn extension(&self) -> Option<String> {
        extension_of_name(&self.name)
    }
}

pub(crate) fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}

pub(crate) fn extension_of_name(name: &str) -> Option<String> {
    let (stem, extension) = name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

pub(crate) fn name_of_path(path: &str) -> &str {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn time_unit_parses_plural_and_case() {
        assert_eq!("Days".parse::<TimeUnit>(), Ok(TimeUnit::Day));
        assert_eq!("week".parse::<TimeUnit>(), Ok(TimeUnit::Week));
        assert_eq!("MONTHS".parse::<TimeUnit>(), Ok(TimeUnit::Month));
        assert_eq!("hours".parse::<TimeUnit>(), Ok(TimeUnit::Hour));
        assert!("fortnight".parse::<TimeUnit>().is_err());
        assert!("".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn unit_lengths_are_fixed_approximations() {
        assert_eq!(TimeUnit::Week.seconds(), 7 * TimeUnit::Day.seconds());
        assert_eq!(TimeUnit::Month.seconds(), 30 * 86_400);
        assert_eq!(TimeUnit::Year.seconds(), 365 * 86_400);
    }

    #[test]
    fn date_range_orders_bounds_and_is_inclusive() {
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let b = a + Duration::days(3);
        let range = DateRange::new(b, a);
        assert_eq!(range.start, a);
        assert_eq!(range.end, b);
        assert!(range.contains(a));
        assert!(range.contains(b));
        assert!(!range.contains(b + Duration::seconds(1)));
    }

    #[test]
    fn indicator_normalizes_extensions() {
        let indicator = FileTypeIndicator::new("photos", [".JPG", "png", " "], false);
        assert_eq!(
            indicator.extensions.into_iter().collect::<Vec<_>>(),
            vec!["jpg".to_string(), "png".to_string()]
        );
    }

    #[test]
    fn record_name_and_extension_from_path() {
        let record = ResultRecord::from_path("/Users/me/Documents/Resume.PDF");
        assert_eq!(record.name, "Resume.PDF");
        assert_eq!(record.extension().as_deref(), Some("pdf"));
        assert_eq!(ResultRecord::from_path("/tmp/.bashrc").extension(), None);
    }
}
