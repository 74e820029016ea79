//! Approximate span matching between snippets of the same file.
//!
//! The vector leg returns whole chunks while the keyword leg may return a
//! narrower snippet, so equality of text is too strict. Two snippets are the
//! same span when one contains the other after normalization, or when their
//! token overlap relative to the smaller token set reaches the threshold.

use std::collections::HashSet;

/// Lowercase and collapse whitespace.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Overlap coefficient of the two token sets: `|A ∩ B| / min(|A|, |B|)`.
#[must_use]
pub fn token_overlap(a: &str, b: &str) -> f32 {
    let a = tokens(a);
    let b = tokens(b);
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    ratio(shared, smaller)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn ratio(numerator: usize, denominator: usize) -> f32 {
    (numerator as f64 / denominator as f64) as f32
}

/// True if `a` and `b` describe approximately the same text span.
#[must_use]
pub fn spans_overlap(a: &str, b: &str, threshold: f32) -> bool {
    let a_norm = normalize_text(a);
    let b_norm = normalize_text(b);
    if a_norm.is_empty() || b_norm.is_empty() {
        return false;
    }
    if a_norm.contains(&b_norm) || b_norm.contains(&a_norm) {
        return true;
    }
    token_overlap(&a_norm, &b_norm) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containment_ignores_case_and_whitespace() {
        assert!(spans_overlap(
            "Vacation   policy: 20 days per year.",
            "vacation POLICY",
            0.9
        ));
    }

    #[test]
    fn test_token_overlap_threshold() {
        let chunk = "employees accrue vacation days monthly";
        let snippet = "vacation days accrue quarterly";
        assert!((token_overlap(chunk, snippet) - 0.75).abs() < 1e-6);
        assert!(spans_overlap(chunk, snippet, 0.5));
        assert!(!spans_overlap(chunk, snippet, 0.8));
    }

    #[test]
    fn test_empty_text_never_overlaps() {
        assert!(!spans_overlap("", "anything", 0.0));
        assert!(!spans_overlap("   ", "   ", 0.0));
        assert!(token_overlap("", "x").abs() < f32::EPSILON);
    }

    #[test]
    fn test_token_overlap_exact_for_large_snippets() {
        let a: Vec<String> = (0..70_000).map(|i| format!("t{i}")).collect();
        let b: Vec<String> = (35_000..105_000).map(|i| format!("t{i}")).collect();
        let overlap = token_overlap(&a.join(" "), &b.join(" "));
        assert!((overlap - 0.5).abs() < 1e-6, "{overlap}");
    }
}
