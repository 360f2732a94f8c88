//! Rendering of composite filters as Spotlight query strings.
//!
//! The output is accepted by `mdfind` and `MDQueryCreate`:
//!
//! ```text
//! (kMDItemContentTypeTree == "com.adobe.pdf") && (kMDItemFSContentChangeDate > $time.iso(2024-11-03T09:30:00Z))
//! ```

use chrono::{DateTime, SecondsFormat, Utc};

use super::expression::{CompositeFilter, FilterExpression, FilterPredicate, TextField};

const CONTENT_TYPE_TREE: &str = "kMDItemContentTypeTree";
const TEXT_CONTENT: &str = "kMDItemTextContent";
const FS_NAME: &str = "kMDItemFSName";
const CONTENT_CHANGE_DATE: &str = "kMDItemFSContentChangeDate";

/// Renders the filter as a Spotlight query expression.
pub fn render(filter: &CompositeFilter) -> String {
    render_expression(filter.expression())
}

fn render_expression(expression: &FilterExpression) -> String {
    match expression {
        FilterExpression::Predicate(predicate) => render_predicate(predicate),
        FilterExpression::And(parts) => render_group(parts, " && "),
        FilterExpression::Or(parts) => render_group(parts, " || "),
    }
}

fn render_group(parts: &[FilterExpression], separator: &str) -> String {
    parts
        .iter()
        .map(|part| format!("({})", render_expression(part)))
        .collect::<Vec<_>>()
        .join(separator)
}

fn render_predicate(predicate: &FilterPredicate) -> String {
    match predicate {
        FilterPredicate::ContentType(id) => {
            format!("{CONTENT_TYPE_TREE} == \"{}\"", escape(id))
        }
        FilterPredicate::TextContains { field, value } => {
            let attribute = match field {
                TextField::Content => TEXT_CONTENT,
                TextField::Name => FS_NAME,
            };
            format!("{attribute} == \"*{}*\"cd", escape(value))
        }
        FilterPredicate::ChangedAfter(instant) => {
            format!("{CONTENT_CHANGE_DATE} > $time.iso({})", iso(instant))
        }
    }
}

fn iso(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Escapes quoting and wildcard characters inside a string literal.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '"' | '\\' | '*' | '?') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterCompiler;
    use crate::hierarchy::TypeHierarchy;
    use crate::types::{FileTypeIndicator, ParsedQuery, TemporalPhrase, TimeUnit};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn renders_type_and_date() {
        let parsed = ParsedQuery {
            file_types: vec![FileTypeIndicator::new("pdf", ["pdf"], true)],
            temporal: vec![TemporalPhrase {
                text: "7 months ago".to_string(),
                value: 7,
                unit: TimeUnit::Month,
                fuzzy: false,
            }],
            residual_keywords: String::new(),
            original_query: "pdf 7 months ago".to_string(),
        };
        let filter = FilterCompiler::new(TypeHierarchy::builtin()).compile(&parsed, now());
        assert_eq!(
            render(&filter),
            "(kMDItemContentTypeTree == \"com.adobe.pdf\") && \
             (kMDItemFSContentChangeDate > $time.iso(2024-11-03T09:30:00Z))"
        );
    }

    #[test]
    fn renders_keyword_group() {
        let filter = FilterCompiler::new(TypeHierarchy::builtin())
            .compile(&ParsedQuery::keyword_only("budget", "budget"), now());
        assert_eq!(
            render(&filter),
            "(kMDItemTextContent == \"*budget*\"cd) || (kMDItemFSName == \"*budget*\"cd)"
        );
    }

    #[test]
    fn escapes_literals() {
        let filter = FilterCompiler::new(TypeHierarchy::builtin()).compile(
            &ParsedQuery {
                original_query: "say \"hi\" *now*".to_string(),
                ..ParsedQuery::default()
            },
            now(),
        );
        assert!(filter.is_fallback());
        assert_eq!(
            render(&filter),
            "kMDItemFSName == \"*say \\\"hi\\\" \\*now\\**\"cd"
        );
    }
}
