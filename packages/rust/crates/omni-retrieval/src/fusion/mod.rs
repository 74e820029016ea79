//! Score fusion for hybrid retrieval.
//!
//! Layout: `kernels` (boost, clamp, rank order), `span_match` (approximate
//! span equality between legs). [`ScoreFusionEngine`] is pure: identical input
//! yields identical output regardless of the order candidates arrived in.

mod kernels;
mod span_match;

use std::collections::BTreeMap;

pub use kernels::{boosted_score, clamp_score, rank_order};
pub use span_match::{normalize_text, spans_overlap, token_overlap};

use crate::config::RetrievalConfig;
use crate::types::{MatchedBy, RetrievalCandidate, SourceLeg};

/// Boost, threshold, and sort candidates from both legs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreFusionEngine {
    keyword_boost_factor: f32,
    keyword_base_score: f32,
    min_confidence_score: f32,
    span_overlap_threshold: f32,
}

impl ScoreFusionEngine {
    /// Take the fusion parameters from a validated config.
    #[must_use]
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            keyword_boost_factor: config.keyword_boost_factor,
            keyword_base_score: config.keyword_base_score,
            min_confidence_score: config.min_confidence_score,
            span_overlap_threshold: config.span_overlap_threshold,
        }
    }

    /// Fuse raw leg output into a thresholded, rank-ordered list.
    ///
    /// A keyword hit supports a vector hit when both come from the same
    /// namespace and file and describe the same span. Supported vector hits are
    /// boosted and marked [`MatchedBy::Both`]; the supporting keyword hits are
    /// consumed. Remaining keyword hits score `keyword_base_score`.
    #[must_use]
    pub fn fuse(&self, candidates: Vec<RetrievalCandidate>) -> Vec<RetrievalCandidate> {
        let input = candidates.len();
        let (mut vector, mut keyword): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|candidate| candidate.source_leg == SourceLeg::Vector);

        for candidate in &mut vector {
            candidate.raw_score = clamp_score(candidate.raw_score);
            candidate.final_score = candidate.raw_score;
            candidate.matched_by = MatchedBy::Vector;
        }
        vector.sort_by(rank_order);
        keyword.sort_by(|a, b| {
            a.file_identifier
                .cmp(&b.file_identifier)
                .then_with(|| a.id.cmp(&b.id))
                .then_with(|| a.namespace.cmp(&b.namespace))
                .then_with(|| a.text.cmp(&b.text))
        });

        // keyword index -> strongest vector index it supports
        let mut support: BTreeMap<usize, usize> = BTreeMap::new();
        for (k_idx, hit) in keyword.iter().enumerate() {
            if let Some(v_idx) = vector.iter().position(|v| self.same_span(v, hit)) {
                support.insert(k_idx, v_idx);
            }
        }

        let mut boosted = vec![false; vector.len()];
        for &v_idx in support.values() {
            boosted[v_idx] = true;
        }
        for (candidate, _) in vector.iter_mut().zip(&boosted).filter(|(_, b)| **b) {
            candidate.final_score = boosted_score(candidate.raw_score, self.keyword_boost_factor);
            candidate.matched_by = MatchedBy::Both;
        }

        let mut keyword_only = 0_usize;
        let unsupported = keyword
            .into_iter()
            .enumerate()
            .filter(|(k_idx, _)| !support.contains_key(k_idx))
            .map(|(_, mut candidate)| {
                keyword_only += 1;
                candidate.final_score = self.keyword_base_score;
                candidate.matched_by = MatchedBy::Keyword;
                candidate
            });
        let mut fused: Vec<RetrievalCandidate> = vector.into_iter().chain(unsupported).collect();

        let before_threshold = fused.len();
        fused.retain(|candidate| candidate.final_score >= self.min_confidence_score);
        fused.sort_by(rank_order);

        tracing::debug!(
            event = "retrieval.fusion.completed",
            input,
            boosted = boosted.iter().filter(|b| **b).count(),
            keyword_only,
            below_threshold = before_threshold - fused.len(),
            output = fused.len(),
            "candidates fused"
        );
        fused
    }

    fn same_span(&self, vector: &RetrievalCandidate, keyword: &RetrievalCandidate) -> bool {
        vector.namespace == keyword.namespace
            && vector.file_identifier == keyword.file_identifier
            && (vector.id == keyword.id
                || spans_overlap(&vector.text, &keyword.text, self.span_overlap_threshold))
    }
}
