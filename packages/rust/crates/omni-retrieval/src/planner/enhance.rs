//! Recall-boosting query rewrites.
//!
//! Embeddings under-weight short proper nouns, so "who is John Smith" tends to
//! surface generic biography chunks instead of the contact sheet that names
//! him. When a contact-lookup intent is detected, the name is appended as an
//! exact-match sub-query. The original text is always kept verbatim.

use serde::Serialize;

/// Max tokens taken for one extracted name.
const MAX_NAME_TOKENS: usize = 4;

/// Trigger phrases, longest first so "contact details for" wins over "contact for".
const CONTACT_TRIGGERS: &[&[&str]] = &[
    &["contact", "information", "for"],
    &["contact", "information", "of"],
    &["contact", "details", "for"],
    &["contact", "details", "of"],
    &["contact", "info", "for"],
    &["contact", "info", "of"],
    &["email", "address", "of"],
    &["email", "address", "for"],
    &["phone", "number", "of"],
    &["phone", "number", "for"],
    &["how", "do", "i", "reach"],
    &["how", "can", "i", "reach"],
    &["how", "to", "reach"],
    &["contact", "for"],
    &["contact", "of"],
    &["email", "of"],
    &["email", "for"],
    &["phone", "of"],
    &["phone", "for"],
    &["who", "is"],
    &["who's"],
    &["whos"],
];

/// Leading words skipped before the name starts.
const NAME_PREFIX_SKIP: &[&str] = &["the", "a", "an", "our", "my", "mr", "mrs", "ms"];

/// Lowercase particles kept inside a capitalised run ("Head of Sales", "Ludwig van Beethoven").
const NAME_CONNECTIVES: &[&str] = &["of", "de", "del", "der", "da", "van", "von", "la", "le", "du"];

/// Characters that end a name run when they trail a token.
const RUN_TERMINATORS: &[char] = &['?', '!', ',', ';', ':'];

/// Detected contact-lookup intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactIntent {
    /// Trigger phrase that fired (lowercase, space-joined).
    pub trigger: String,
    /// Extracted name tokens, space-joined, original casing.
    pub name: String,
}

/// Query text after enhancement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhancedQuery {
    /// Caller's query, untouched.
    pub original: String,
    /// Exact-match sub-queries appended by enhancement.
    pub exact_terms: Vec<String>,
}

impl EnhancedQuery {
    /// Query with no rewrites.
    pub fn plain(original: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            exact_terms: Vec::new(),
        }
    }

    /// True if any sub-query was appended.
    #[must_use]
    pub fn is_enhanced(&self) -> bool {
        !self.exact_terms.is_empty()
    }

    /// Text handed to the embedding leg: the original followed by each sub-query.
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = self.original.clone();
        for term in &self.exact_terms {
            text.push(' ');
            text.push_str(term);
        }
        text
    }
}

/// Detect a contact-lookup intent and extract the name it targets.
///
/// Returns `None` when no trigger phrase is present or nothing usable follows it.
#[must_use]
pub fn detect_contact_intent(text: &str) -> Option<ContactIntent> {
    let normalized = text.replace('\u{2019}', "'");
    let raw_tokens: Vec<&str> = normalized.split_whitespace().collect();
    let lowered: Vec<String> = raw_tokens
        .iter()
        .map(|token| {
            token
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase()
        })
        .collect();

    for start in 0..lowered.len() {
        for trigger in CONTACT_TRIGGERS {
            let end = start + trigger.len();
            if end > lowered.len() {
                continue;
            }
            if lowered[start..end]
                .iter()
                .zip(trigger.iter())
                .all(|(token, expected)| token == expected)
            {
                if let Some(name) = extract_name(&raw_tokens[end..]) {
                    return Some(ContactIntent {
                        trigger: trigger.join(" "),
                        name,
                    });
                }
                return None;
            }
        }
    }
    None
}

/// Enhance a query: append the contact name as an exact sub-query when detected.
#[must_use]
pub fn enhance_query(text: &str) -> EnhancedQuery {
    let mut enhanced = EnhancedQuery::plain(text);
    if let Some(intent) = detect_contact_intent(text) {
        enhanced.exact_terms.push(intent.name);
    }
    enhanced
}

struct NameToken {
    text: String,
    capitalised: bool,
    terminates: bool,
}

fn clean_name_token(raw: &str) -> Option<NameToken> {
    let terminates = raw.trim_end_matches(['"', '\'', ')']).ends_with(RUN_TERMINATORS);
    let mut text = raw
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string();
    for suffix in ["'s", "'S"] {
        if let Some(stripped) = text.strip_suffix(suffix) {
            text = stripped.to_string();
        }
    }
    if text.is_empty() {
        return None;
    }
    let capitalised = text.chars().next().is_some_and(char::is_uppercase);
    Some(NameToken {
        text,
        capitalised,
        terminates,
    })
}

fn extract_name(rest: &[&str]) -> Option<String> {
    let tokens: Vec<NameToken> = rest.iter().copied().filter_map(clean_name_token).collect();
    let skip = tokens
        .iter()
        .take_while(|token| NAME_PREFIX_SKIP.contains(&token.text.to_lowercase().as_str()))
        .count();
    let tokens = &tokens[skip..];
    if tokens.is_empty() {
        return None;
    }

    let picked: Vec<&str> = if let Some(first_cap) = tokens.iter().position(|t| t.capitalised) {
        capitalised_run(&tokens[first_cap..])
    } else {
        take_run(tokens)
    };

    if picked.is_empty() {
        None
    } else {
        Some(picked.join(" "))
    }
}

fn take_run(tokens: &[NameToken]) -> Vec<&str> {
    let mut run = Vec::new();
    for token in tokens {
        if run.len() == MAX_NAME_TOKENS {
            break;
        }
        run.push(token.text.as_str());
        if token.terminates {
            break;
        }
    }
    run
}

/// Capitalised tokens, bridging single connectives that sit between two of them.
fn capitalised_run(tokens: &[NameToken]) -> Vec<&str> {
    let mut run: Vec<&str> = Vec::new();
    let mut idx = 0;
    while idx < tokens.len() && run.len() < MAX_NAME_TOKENS {
        let token = &tokens[idx];
        if !token.capitalised {
            let bridges = !run.is_empty()
                && !token.terminates
                && run.len() + 2 <= MAX_NAME_TOKENS
                && NAME_CONNECTIVES.contains(&token.text.to_lowercase().as_str())
                && tokens.get(idx + 1).is_some_and(|next| next.capitalised);
            if !bridges {
                break;
            }
        }
        run.push(token.text.as_str());
        if token.terminates {
            break;
        }
        idx += 1;
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_who_is_extracts_full_name() {
        let intent = detect_contact_intent("who is John Smith").unwrap();
        assert_eq!(intent.trigger, "who is");
        assert_eq!(intent.name, "John Smith");
    }

    #[test]
    fn test_trailing_punctuation_and_possessive_stripped() {
        assert_eq!(
            detect_contact_intent("Who is John Smith?").unwrap().name,
            "John Smith"
        );
        assert_eq!(
            detect_contact_intent("what is the phone number of Ada Lovelace's office")
                .unwrap()
                .name,
            "Ada Lovelace"
        );
    }

    #[test]
    fn test_name_run_stops_at_lowercase_word() {
        let intent = detect_contact_intent("email of Alice Wong at ACME").unwrap();
        assert_eq!(intent.trigger, "email of");
        assert_eq!(intent.name, "Alice Wong");
    }

    #[test]
    fn test_longer_trigger_preferred() {
        let intent = detect_contact_intent("contact details for Maria Garcia").unwrap();
        assert_eq!(intent.trigger, "contact details for");
        assert_eq!(intent.name, "Maria Garcia");
    }

    #[test]
    fn test_lowercase_name_falls_back_to_remaining_tokens() {
        let intent = detect_contact_intent("contact for jane doe").unwrap();
        assert_eq!(intent.name, "jane doe");
    }

    #[test]
    fn test_article_skipped_and_connective_bridged() {
        let intent = detect_contact_intent("who is the Head of Sales").unwrap();
        assert_eq!(intent.name, "Head of Sales");
        let intent = detect_contact_intent("contact for Ludwig van Beethoven please").unwrap();
        assert_eq!(intent.name, "Ludwig van Beethoven");
    }

    #[test]
    fn test_trailing_connective_not_kept() {
        let intent = detect_contact_intent("email of Maria de the board").unwrap();
        assert_eq!(intent.name, "Maria");
    }

    #[test]
    fn test_curly_apostrophe_trigger() {
        let intent = detect_contact_intent("who\u{2019}s Grace Hopper").unwrap();
        assert_eq!(intent.name, "Grace Hopper");
    }

    #[test]
    fn test_name_capped_at_four_tokens() {
        let intent = detect_contact_intent("who is Anna Maria Luisa De Medici").unwrap();
        assert_eq!(intent.name, "Anna Maria Luisa De");
    }

    #[test]
    fn test_no_trigger_no_intent() {
        assert!(detect_contact_intent("quarterly revenue report 2024").is_none());
        assert!(detect_contact_intent("who is").is_none());
    }

    #[test]
    fn test_enhancement_only_appends() {
        let enhanced = enhance_query("who is John Smith");
        assert!(enhanced.is_enhanced());
        assert_eq!(enhanced.original, "who is John Smith");
        assert_eq!(enhanced.exact_terms, vec!["John Smith".to_string()]);
        assert!(enhanced.text().starts_with("who is John Smith"));
        assert_eq!(enhanced.text(), "who is John Smith John Smith");

        let plain = enhance_query("vacation policy");
        assert!(!plain.is_enhanced());
        assert_eq!(plain.text(), "vacation policy");
    }
}
