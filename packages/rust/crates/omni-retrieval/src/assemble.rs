//! Final deduplication and truncation.

use std::collections::HashSet;

use crate::types::{RankedResult, RetrievalCandidate};

/// Turns rank-ordered candidates into caller-facing results.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAssembler;

impl ResultAssembler {
    /// Keep the first candidate per `file_identifier`, then cap at `top_k`.
    ///
    /// `candidates` must already be in rank order, so the first occurrence of a
    /// file is its highest-scoring snippet.
    #[must_use]
    pub fn assemble(candidates: Vec<RetrievalCandidate>, top_k: usize) -> Vec<RankedResult> {
        let mut seen = HashSet::new();
        let results: Vec<RankedResult> = candidates
            .into_iter()
            .filter(|candidate| seen.insert(candidate.file_identifier.clone()))
            .take(top_k)
            .map(|candidate| RankedResult {
                file_identifier: candidate.file_identifier,
                text: candidate.text,
                final_score: candidate.final_score,
                matched_by: candidate.matched_by,
            })
            .collect();
        tracing::debug!(
            event = "retrieval.assemble.completed",
            files_seen = seen.len(),
            returned = results.len(),
            top_k,
            "results assembled"
        );
        results
    }
}
