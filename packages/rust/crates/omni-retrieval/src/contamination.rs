//! Post-fusion namespace enforcement.
//!
//! Runs independently of the planner: whatever a backend reports, nothing
//! outside the resolved namespace set reaches the assembler. Violations are
//! security events and always surface as
//! [`RetrievalWarning::ContaminationViolationDetected`].

use crate::types::{NamespaceSet, RetrievalCandidate, RetrievalWarning, ScopeMode};

/// Drops candidates whose namespace is outside the request scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContaminationFilter;

impl ContaminationFilter {
    /// Keep only candidates inside `namespaces`, in their input order.
    ///
    /// Returns the survivors and one warning per dropped candidate.
    #[must_use]
    pub fn apply(
        candidates: Vec<RetrievalCandidate>,
        namespaces: &NamespaceSet,
        scope: ScopeMode,
    ) -> (Vec<RetrievalCandidate>, Vec<RetrievalWarning>) {
        let mut kept = Vec::with_capacity(candidates.len());
        let mut warnings = Vec::new();
        for candidate in candidates {
            if namespaces.contains(&candidate.namespace) {
                kept.push(candidate);
                continue;
            }
            tracing::warn!(
                event = "retrieval.contamination.violation",
                security = true,
                scope = %scope,
                candidate_id = %candidate.id,
                namespace = %candidate.namespace,
                leg = ?candidate.source_leg,
                "dropped candidate from out-of-scope namespace"
            );
            warnings.push(RetrievalWarning::ContaminationViolationDetected {
                candidate_id: candidate.id,
                namespace: candidate.namespace,
            });
        }
        (kept, warnings)
    }
}
