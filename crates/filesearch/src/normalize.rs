//! Stopword removal and residual keyword computation.

/// Filler words removed before extraction.
///
/// Approximation qualifiers ("about", "around", "roughly", "approximately")
/// are deliberately absent: the temporal matcher needs them.
pub const STOP_WORDS: &[&str] = &[
    // articles and conjunctions
    "a", "an", "the", "and", "any", "or", "all",
    // prepositions
    "in", "at", "of", "by", "as", "on", "to", "for", "from", "with", "within", "into",
    // pronouns and possessives
    "me", "my", "mine", "i", "our", "some",
    // search verbs
    "find", "search", "list", "show", "get", "locate", "open", "look", "lookup",
    // temporal connectives
    "ago", "back", "past", "earlier", "since",
    // generic nouns
    "file", "files",
];

/// Minimum length (in chars) a residual keyword token must exceed.
const MIN_RESIDUAL_TOKEN_LEN: usize = 2;

fn is_stop_word(token: &str) -> bool {
    let bare = token.trim_matches(|ch: char| ch.is_ascii_punctuation());
    if bare.is_empty() {
        return false;
    }
    STOP_WORDS
        .iter()
        .any(|stop_word| stop_word.eq_ignore_ascii_case(bare))
}

/// Removes stop words, keeping the remaining tokens in order.
///
/// Idempotent: normalizing an already normalized string returns it unchanged.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .filter(|token| !is_stop_word(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Subtracts extractor-claimed spans from the normalized text and drops
/// short tokens.
pub fn residual_keywords<S: AsRef<str>>(normalized: &str, claimed: &[S]) -> String {
    let mut remaining = normalized.to_string();
    for span in claimed {
        remaining = remove_case_insensitive(&remaining, span.as_ref().trim());
    }
    remaining
        .split_whitespace()
        .filter(|token| token.chars().count() > MIN_RESIDUAL_TOKEN_LEN)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Removes every case-insensitive occurrence of `needle` that stands on
/// token boundaries, leaving a space in its place so neighbouring tokens stay
/// separated. Occurrences inside a longer word ("code" in "barcode") are kept.
pub(crate) fn remove_case_insensitive(haystack: &str, needle: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    // ASCII lowercasing keeps byte offsets aligned with the original.
    let lower_haystack = haystack.to_ascii_lowercase();
    let lower_needle = needle.to_ascii_lowercase();

    let mut result = String::with_capacity(haystack.len());
    let mut cursor = 0usize;
    let mut search_from = 0usize;
    while let Some(found) = lower_haystack[search_from..].find(lower_needle.as_str()) {
        let start = search_from + found;
        let end = start + lower_needle.len();
        if on_token_boundaries(haystack, start, end) {
            result.push_str(&haystack[cursor..start]);
            result.push(' ');
            cursor = end;
            search_from = end;
        } else {
            search_from = start
                + haystack[start..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
        }
    }
    result.push_str(&haystack[cursor..]);
    result
}

fn on_token_boundaries(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_filler_words_and_keeps_order() {
        assert_eq!(
            normalize("find my resume from 1 week ago"),
            "resume 1 week"
        );
        assert_eq!(normalize("Search THE pdf Files"), "pdf");
    }

    #[test]
    fn keeps_fuzzy_qualifiers() {
        assert_eq!(normalize("about 3 weeks ago"), "about 3 weeks");
        assert_eq!(
            normalize("roughly 2 months back"),
            "roughly 2 months"
        );
    }

    #[test]
    fn matching_ignores_surrounding_punctuation() {
        assert_eq!(normalize("find, the budget"), "budget");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in [
            "find my resume from 1 week ago",
            "  images   from yesterday ",
            "the a an",
            "",
            "Quarterly REPORT, pdf (draft)",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn residual_subtracts_claimed_spans_case_insensitively() {
        let residual = residual_keywords("Wedding Photos 3 days", &["photos", "3 days"]);
        assert_eq!(residual, "Wedding");
    }

    #[test]
    fn residual_only_removes_whole_tokens() {
        assert_eq!(residual_keywords("barcode code scanner", &["code"]), "barcode scanner");
        assert_eq!(residual_keywords("pdfs pdf", &["pdf"]), "pdfs");
        assert_eq!(
            residual_keywords("tax-report 2 weeks", &["2 weeks"]),
            "tax-report"
        );
    }

    #[test]
    fn residual_drops_short_tokens() {
        let residual = residual_keywords("q3 tax pdf ok", &["pdf"]);
        assert_eq!(residual, "tax");
    }

    #[test]
    fn residual_without_claims_is_filtered_text() {
        assert_eq!(residual_keywords::<&str>("asdkjasd", &[]), "asdkjasd");
        assert_eq!(residual_keywords::<&str>("", &[]), "");
    }
}
