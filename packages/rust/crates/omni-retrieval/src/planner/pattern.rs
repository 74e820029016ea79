//! Keyword-leg pattern construction.
//!
//! The keyword backend treats its input as a regex, so every literal taken
//! from user text goes through [`regex::escape`] before it is joined.

use std::collections::HashSet;

use super::enhance::EnhancedQuery;

/// Max content terms in a fallback pattern.
const MAX_PATTERN_TERMS: usize = 8;
/// Min chars for a content term.
const MIN_TERM_CHARS: usize = 3;

const STOPWORDS: &[&str] = &[
    "about", "and", "any", "are", "can", "did", "does", "for", "from", "get", "has", "have", "how",
    "into", "its", "not", "our", "please", "show", "tell", "that", "the", "their", "them",
    "there", "these", "this", "what", "when", "where", "which", "who", "whom", "why", "will",
    "with", "you", "your",
];

/// Characters trimmed from the edges of a content term.
const EDGE_PUNCTUATION: &[char] = &[
    '?', '!', ',', ';', ':', '.', '"', '\'', '(', ')', '[', ']', '{', '}', '<', '>', '`',
];

/// Escape one literal and let internal whitespace match any whitespace run.
#[must_use]
pub fn escape_literal(literal: &str) -> String {
    literal
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

/// Content terms of a free-text query: stopwords and short tokens removed,
/// case-insensitively deduplicated, in first-seen order.
#[must_use]
pub fn content_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split_whitespace()
        .map(|token| token.trim_matches(EDGE_PUNCTUATION))
        .filter(|term| term.chars().count() >= MIN_TERM_CHARS)
        .filter(|term| !STOPWORDS.contains(&term.to_lowercase().as_str()))
        .filter(|term| seen.insert(term.to_lowercase()))
        .take(MAX_PATTERN_TERMS)
        .map(str::to_string)
        .collect()
}

/// Build the keyword-leg pattern for an enhanced query.
///
/// Exact-match sub-queries come first, followed by the content terms of the
/// original text, so enhancement only ever widens what the keyword leg can
/// match. Returns `None` when nothing searchable remains.
#[must_use]
pub fn keyword_pattern(query: &EnhancedQuery) -> Option<String> {
    let mut seen = HashSet::new();
    let escaped: Vec<String> = query
        .exact_terms
        .iter()
        .cloned()
        .chain(content_terms(&query.original))
        .filter(|literal| seen.insert(literal_key(literal)))
        .map(|literal| escape_literal(&literal))
        .filter(|escaped| !escaped.is_empty())
        .collect();
    if escaped.is_empty() {
        None
    } else {
        Some(escaped.join("|"))
    }
}

fn literal_key(literal: &str) -> String {
    literal
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
