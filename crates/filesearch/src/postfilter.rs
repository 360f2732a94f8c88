//! Client-side date filtering for backends that cannot push temporal
//! constraints down (vector indexes).

use crate::types::{DateRange, ResultRecord};

/// Keeps records whose modification time, or failing that creation time,
/// lies within `range` (inclusive). Records with neither are dropped.
///
/// Runs after top-K retrieval, so older relevant results outside the top K
/// are never recovered.
pub fn post_filter(records: Vec<ResultRecord>, range: &DateRange) -> Vec<ResultRecord> {
    let before = records.len();
    let kept = records
        .into_iter()
        .filter(|record| {
            record
                .modified_at
                .or(record.created_at)
                .is_some_and(|timestamp| range.contains(timestamp))
        })
        .collect::<Vec<_>>();
    log::debug!(
        "post-filtered records kept={} dropped={} start={} end={}",
        kept.len(),
        before - kept.len(),
        range.start,
        range.end
    );
    kept
}
