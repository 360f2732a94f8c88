//! Relative time phrase recognition and resolution.
//!
//! ## Supported Syntax
//!
//! ### Numeric phrases
//! - `3 days ago`, `2 weeks`, `7 months ago`, `1 year`
//! - `about 3 weeks ago`, `roughly 2 months`, `around 10 days`,
//!   `approximately 1 year` (fuzzy)
//!
//! ### Relative keywords
//! - `today`, `yesterday`
//! - `last hour`, `last day`, `last week`, `last month`, `last year`
//!
//! ## Resolution
//!
//! An exact phrase of magnitude Δ resolves to `[now - Δ, now]`. A fuzzy
//! phrase resolves to a window centred on `now - Δ` with a half width of
//! `0.2 * Δ` by default; it does not extend to now.
//!
//! `today` (and `0 days`) covers the current local calendar day: local
//! midnight up to now.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Local, Utc};
use regex::Regex;

use crate::types::{DateRange, TemporalPhrase, TimeUnit};

/// Default half width of a fuzzy window, as a fraction of the magnitude.
pub const DEFAULT_FUZZY_HALF_WIDTH: f64 = 0.2;

/// Approximation words that make a phrase fuzzy.
pub const FUZZY_QUALIFIERS: &[&str] = &["around", "about", "roughly", "approximately"];

fn numeric_phrase_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:(around|about|roughly|approximately)\s+)?(\d+)\s+(hour|day|week|month|year)s?\b(?:\s+ago\b)?",
        )
        .unwrap_or_else(|error| panic!("invalid temporal regex: {error}"))
    })
}

fn keyword_phrase_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\b(?:(today)|(yesterday)|last\s+(hour|day|week|month|year))\b")
            .unwrap_or_else(|error| panic!("invalid temporal keyword regex: {error}"))
    })
}

/// Resolves a phrase to an absolute range using the default fuzzy width.
pub fn resolve(value: u32, unit: TimeUnit, fuzzy: bool, now: DateTime<Utc>) -> DateRange {
    resolve_with_half_width(value, unit, fuzzy, now, DEFAULT_FUZZY_HALF_WIDTH)
}

/// Resolves a phrase to an absolute range.
///
/// `value == 0` is valid and collapses the range onto `now`. Magnitudes that
/// leave the representable range saturate instead of panicking.
pub fn resolve_with_half_width(
    value: u32,
    unit: TimeUnit,
    fuzzy: bool,
    now: DateTime<Utc>,
    half_width: f64,
) -> DateRange {
    let magnitude_ms = i64::from(value)
        .saturating_mul(unit.seconds())
        .saturating_mul(1_000);
    let target = shift_back(now, magnitude_ms);

    if !fuzzy {
        return DateRange::new(target, now);
    }

    let buffer_ms = (magnitude_ms as f64 * half_width.abs()).round() as i64;
    DateRange::new(shift_back(target, buffer_ms), shift_forward(target, buffer_ms))
}

/// Resolves a parsed phrase. An exact zero-day phrase ("today") spans the
/// current local day.
pub fn resolve_phrase(phrase: &TemporalPhrase, now: DateTime<Utc>, half_width: f64) -> DateRange {
    if phrase.value == 0 && phrase.unit == TimeUnit::Day && !phrase.fuzzy {
        return today_range(now);
    }
    resolve_with_half_width(phrase.value, phrase.unit, phrase.fuzzy, now, half_width)
}

/// `[local midnight, now]`.
pub fn today_range(now: DateTime<Utc>) -> DateRange {
    let start = now
        .with_timezone(&Local)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|midnight| midnight.with_timezone(&Utc))
        .filter(|start| *start <= now)
        .unwrap_or_else(|| shift_back(now, TimeUnit::Day.seconds() * 1_000));
    DateRange::new(start, now)
}

fn shift_back(instant: DateTime<Utc>, millis: i64) -> DateTime<Utc> {
    Duration::try_milliseconds(millis)
        .and_then(|delta| instant.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn shift_forward(instant: DateTime<Utc>, millis: i64) -> DateTime<Utc> {
    Duration::try_milliseconds(millis)
        .and_then(|delta| instant.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Finds `[qualifier] <integer> <unit>[s] [ago]` phrases, in text order.
///
/// Values that do not fit in a `u32` are skipped.
pub fn extract_phrases(text: &str) -> Vec<TemporalPhrase> {
    numeric_phrases_with_offsets(text)
        .into_iter()
        .map(|(_, phrase)| phrase)
        .collect()
}

/// Numeric phrases plus the relative keywords, merged in text order.
pub fn extract_phrases_with_keywords(text: &str) -> Vec<TemporalPhrase> {
    let mut phrases = numeric_phrases_with_offsets(text);
    for captures in keyword_phrase_regex().captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if phrases
            .iter()
            .any(|(range, _)| range.start < whole.end() && whole.start() < range.end)
        {
            continue;
        }
        let (value, unit) = if captures.get(1).is_some() {
            (0, TimeUnit::Day)
        } else if captures.get(2).is_some() {
            (1, TimeUnit::Day)
        } else {
            let Some(unit) = captures
                .get(3)
                .and_then(|unit| unit.as_str().parse::<TimeUnit>().ok())
            else {
                continue;
            };
            (1, unit)
        };
        phrases.push((
            whole.range(),
            TemporalPhrase {
                text: whole.as_str().to_string(),
                value,
                unit,
                fuzzy: false,
            },
        ));
    }
    phrases.sort_by_key(|(range, _)| range.start);
    phrases.into_iter().map(|(_, phrase)| phrase).collect()
}

fn numeric_phrases_with_offsets(text: &str) -> Vec<(std::ops::Range<usize>, TemporalPhrase)> {
    let mut phrases = Vec::new();
    for captures in numeric_phrase_regex().captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let Some(value) = captures
            .get(2)
            .and_then(|value| value.as_str().parse::<u32>().ok())
        else {
            log::debug!("temporal value out of range phrase={:?}", whole.as_str());
            continue;
        };
        let Some(unit) = captures
            .get(3)
            .and_then(|unit| unit.as_str().parse::<TimeUnit>().ok())
        else {
            continue;
        };
        phrases.push((
            whole.range(),
            TemporalPhrase {
                text: whole.as_str().to_string(),
                value,
                unit,
                fuzzy: captures.get(1).is_some(),
            },
        ));
    }
    phrases
}
