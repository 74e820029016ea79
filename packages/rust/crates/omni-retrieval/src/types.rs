//! Request, candidate, and result types shared by every pipeline stage.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Request
// ============================================================================

/// Which namespaces a request may read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    /// Tenant's personal store plus the shared system store.
    Unified,
    /// Tenant's personal store only.
    UserOnly,
    /// Shared system store only.
    SystemOnly,
    /// Exactly one named knowledge base (requires `kb_id`).
    SpecificKb,
}

impl ScopeMode {
    /// Stable snake_case label used in logs and CLI flags.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unified => "unified",
            Self::UserOnly => "user_only",
            Self::SystemOnly => "system_only",
            Self::SpecificKb => "specific_kb",
        }
    }
}

impl fmt::Display for ScopeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "unified" => Ok(Self::Unified),
            "user_only" | "user" => Ok(Self::UserOnly),
            "system_only" | "system" => Ok(Self::SystemOnly),
            "specific_kb" | "kb" => Ok(Self::SpecificKb),
            other => Err(format!(
                "unknown scope mode `{other}` (expected unified, user_only, system_only, specific_kb)"
            )),
        }
    }
}

/// A retrieval request as received from the chat orchestration layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieveRequest {
    /// Raw user query text.
    pub query: String,
    /// Declared scope intent.
    pub scope: ScopeMode,
    /// Requesting tenant.
    pub tenant_id: String,
    /// Knowledge base id, required for [`ScopeMode::SpecificKb`].
    #[serde(default)]
    pub kb_id: Option<String>,
    /// Result cap override; falls back to the configured `top_k`.
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl RetrieveRequest {
    /// Build a request without a knowledge base or `top_k` override.
    pub fn new(query: impl Into<String>, scope: ScopeMode, tenant_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            scope,
            tenant_id: tenant_id.into(),
            kb_id: None,
            top_k: None,
        }
    }

    /// Attach a knowledge base id.
    #[must_use]
    pub fn with_kb(mut self, kb_id: impl Into<String>) -> Self {
        self.kb_id = Some(kb_id.into());
        self
    }

    /// Override the number of results.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

// ============================================================================
// Namespaces
// ============================================================================

const PERSONAL_PREFIX: &str = "user:";
const KB_PREFIX: &str = "kb:";
const SYSTEM_KEY: &str = "system";

/// Opaque key of one retrievable corpus partition.
///
/// Keys are `user:<tenant>`, `system`, or `kb:<kb_id>`. Identifiers are
/// validated by the planner before they are turned into keys, so a tenant
/// cannot name itself into another partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Wrap a raw key as reported by a backend.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Personal store of `tenant_id`.
    #[must_use]
    pub fn personal(tenant_id: &str) -> Self {
        Self(format!("{PERSONAL_PREFIX}{tenant_id}"))
    }

    /// Shared system store.
    #[must_use]
    pub fn system() -> Self {
        Self(SYSTEM_KEY.to_string())
    }

    /// Named knowledge base.
    #[must_use]
    pub fn knowledge_base(kb_id: &str) -> Self {
        Self(format!("{KB_PREFIX}{kb_id}"))
    }

    /// Raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered set of namespaces resolved for one request.
pub type NamespaceSet = BTreeSet<Namespace>;

// ============================================================================
// Candidates and results
// ============================================================================

/// Retrieval leg that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLeg {
    /// Nearest-neighbor search over embeddings.
    Vector,
    /// Literal/regex match over stored text.
    Keyword,
}

/// Which legs support a ranked result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    /// Vector leg only.
    Vector,
    /// Keyword leg only.
    Keyword,
    /// Both legs agreed on the same span.
    Both,
}

impl From<SourceLeg> for MatchedBy {
    fn from(leg: SourceLeg) -> Self {
        match leg {
            SourceLeg::Vector => Self::Vector,
            SourceLeg::Keyword => Self::Keyword,
        }
    }
}

/// One snippet produced by a retrieval leg. Lives for a single request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalCandidate {
    /// Backend chunk id.
    pub id: String,
    /// Namespace the backend reported for this chunk.
    pub namespace: Namespace,
    /// Leg that produced the candidate.
    pub source_leg: SourceLeg,
    /// Score as reported by the leg: similarity for vector hits, `1.0` for keyword matches.
    pub raw_score: f32,
    /// Score after fusion; equals `raw_score` until fused.
    pub final_score: f32,
    /// Leg agreement after fusion.
    pub matched_by: MatchedBy,
    /// Snippet text.
    pub text: String,
    /// Source file the snippet belongs to.
    pub file_identifier: String,
    /// Backend metadata, passed through untouched.
    pub metadata: serde_json::Value,
}

/// Unit returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Source file.
    pub file_identifier: String,
    /// Snippet text.
    pub text: String,
    /// Fused score in `[0, 1]`.
    pub final_score: f32,
    /// Which legs matched.
    pub matched_by: MatchedBy,
}

/// Non-fatal conditions recorded while serving a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetrievalWarning {
    /// Embedding failed; the vector leg was skipped.
    EmbeddingFailure {
        /// Collaborator error text.
        reason: String,
    },
    /// One namespace's vector query failed.
    VectorLegFailure {
        /// Namespace whose query failed.
        namespace: Namespace,
        /// Collaborator error text.
        reason: String,
    },
    /// Keyword leg failed or was skipped.
    KeywordLegFailure {
        /// Collaborator error text.
        reason: String,
    },
    /// A candidate from outside the resolved scope was dropped.
    ContaminationViolationDetected {
        /// Offending chunk id.
        candidate_id: String,
        /// Namespace it claimed.
        namespace: Namespace,
    },
    /// Neither leg produced any candidate.
    NoResults,
}

impl fmt::Display for RetrievalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmbeddingFailure { reason } => {
                write!(f, "embedding failed, vector leg skipped: {reason}")
            }
            Self::VectorLegFailure { namespace, reason } => {
                write!(f, "vector query failed for {namespace}: {reason}")
            }
            Self::KeywordLegFailure { reason } => {
                write!(f, "keyword leg skipped: {reason}")
            }
            Self::ContaminationViolationDetected {
                candidate_id,
                namespace,
            } => write!(
                f,
                "contamination violation: candidate {candidate_id} from out-of-scope namespace {namespace} dropped"
            ),
            Self::NoResults => f.write_str("no candidates from any retrieval leg"),
        }
    }
}

/// Ranked results plus every warning collected on the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    /// Ordered, deduplicated, capped results.
    pub results: Vec<RankedResult>,
    /// Degradations and security events.
    pub warnings: Vec<RetrievalWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_mode_parse_aliases() {
        assert_eq!("unified".parse::<ScopeMode>(), Ok(ScopeMode::Unified));
        assert_eq!("user-only".parse::<ScopeMode>(), Ok(ScopeMode::UserOnly));
        assert_eq!("SYSTEM".parse::<ScopeMode>(), Ok(ScopeMode::SystemOnly));
        assert_eq!("kb".parse::<ScopeMode>(), Ok(ScopeMode::SpecificKb));
        assert!("everything".parse::<ScopeMode>().is_err());
    }

    #[test]
    fn test_namespace_keys_are_distinct_per_kind() {
        assert_eq!(Namespace::personal("alice").as_str(), "user:alice");
        assert_eq!(Namespace::system().as_str(), "system");
        assert_eq!(Namespace::knowledge_base("hr").as_str(), "kb:hr");
        assert_ne!(Namespace::personal("hr"), Namespace::knowledge_base("hr"));
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let warning = RetrievalWarning::VectorLegFailure {
            namespace: Namespace::system(),
            reason: "timed out".to_string(),
        };
        let value = serde_json::to_value(&warning).unwrap();
        assert_eq!(value["kind"], "vector_leg_failure");
        assert_eq!(value["namespace"], "system");
    }
}
