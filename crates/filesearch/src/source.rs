//! Search backends behind the query pipeline.
//!
//! Two seams:
//! - [`MetadataSource`]: evaluates a [`CompositeFilter`] natively (Spotlight,
//!   an in-memory record set).
//! - [`VectorIndex`]: semantic top-K retrieval; temporal constraints are
//!   applied afterwards by [`post_filter`](crate::postfilter::post_filter).
//!
//! Every backend normalizes its output into [`ResultRecord`].

mod mdfind;
mod memory;
mod vector;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};

use crate::error::Result;
use crate::filter::CompositeFilter;
use crate::types::ResultRecord;

pub use mdfind::{MdfindSource, DEFAULT_MDFIND_TIMEOUT};
pub use memory::MemorySource;
pub use vector::{ScoreOrder, VectorHit, VectorIndex};

/// A metadata index that can evaluate composite filters.
pub trait MetadataSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns at most `max_results` records matching `filter`, restricted to
    /// `scopes` (every indexed location when empty).
    fn query(
        &self,
        filter: &CompositeFilter,
        scopes: &[PathBuf],
        max_results: usize,
    ) -> Result<Vec<ResultRecord>>;
}

/// True when `path` lies under one of `scopes`, or `scopes` is empty.
pub(crate) fn in_scope(path: &str, scopes: &[PathBuf]) -> bool {
    scopes.is_empty() || scopes.iter().any(|scope| Path::new(path).starts_with(scope))
}

/// Parses RFC 3339 timestamps and naive ISO 8601 timestamps. Naive values
/// are interpreted in the local time zone.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    naive
        .and_local_timezone(Local)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339() {
        assert_eq!(
            parse_timestamp("2025-03-01T10:00:00+02:00"),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap())
        );
        assert_eq!(
            parse_timestamp("2025-03-01T10:00:00Z"),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn parses_naive_local_timestamps() {
        let expected = Local
            .with_ymd_and_hms(2024, 11, 5, 14, 30, 15)
            .earliest()
            .map(|local| local.with_timezone(&Utc));
        assert_eq!(
            parse_timestamp("2024-11-05T14:30:15.123456").map(|t| t.timestamp()),
            expected.map(|t| t.timestamp())
        );
        assert_eq!(parse_timestamp("2024-11-05 14:30:15"), expected);
        assert!(parse_timestamp("2024-11-05").is_some());
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("last tuesday"), None);
    }

    #[test]
    fn scope_matching_uses_path_components() {
        let scopes = vec![PathBuf::from("/Users/ana/Documents")];
        assert!(in_scope("/Users/ana/Documents/cv.pdf", &scopes));
        assert!(!in_scope("/Users/ana/DocumentsOld/cv.pdf", &scopes));
        assert!(in_scope("/anything", &[]));
    }
}
