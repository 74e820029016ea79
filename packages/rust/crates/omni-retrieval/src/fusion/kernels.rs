//! Scoring kernels for fusion: boost, clamp, and the total rank order.
//!
//! Single swap-in points for the formulas; fusion and tests share them.

use std::cmp::Ordering;

use crate::types::{MatchedBy, RetrievalCandidate};

/// Clamp a score into `[0, 1]`; non-finite input maps to `0.0`.
#[inline]
#[must_use]
pub fn clamp_score(score: f32) -> f32 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Boosted vector score when both legs agree: `min(1, score * factor)`.
#[inline]
#[must_use]
pub fn boosted_score(vector_score: f32, factor: f32) -> f32 {
    clamp_score(vector_score * factor)
}

/// Descending rank order over fused candidates.
///
/// `final_score` desc, then `Both` before single-leg matches, then shorter
/// text, then `file_identifier`, `id`, and namespace ascending so the order is total.
#[must_use]
pub fn rank_order(a: &RetrievalCandidate, b: &RetrievalCandidate) -> Ordering {
    b.final_score
        .total_cmp(&a.final_score)
        .then_with(|| both_first(a.matched_by, b.matched_by))
        .then_with(|| a.text.chars().count().cmp(&b.text.chars().count()))
        .then_with(|| a.file_identifier.cmp(&b.file_identifier))
        .then_with(|| a.id.cmp(&b.id))
        .then_with(|| a.namespace.cmp(&b.namespace))
}

fn both_first(a: MatchedBy, b: MatchedBy) -> Ordering {
    let rank = |m: MatchedBy| u8::from(m != MatchedBy::Both);
    rank(a).cmp(&rank(b))
}
