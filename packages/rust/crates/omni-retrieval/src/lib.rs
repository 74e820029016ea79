//! Hybrid vector + keyword retrieval with knowledge-base scope isolation.
//!
//! One [`RetrieveRequest`] flows through a fixed pipeline:
//!
//! 1. [`QueryPlanner`] validates the request, resolves its scope to a
//!    [`NamespaceSet`], and appends exact-match sub-queries for contact lookups.
//! 2. [`RetrievalDispatcher`] embeds once and fans out one vector query per
//!    namespace plus one keyword query, each with its own timeout.
//! 3. [`ScoreFusionEngine`] boosts spans both legs agree on, thresholds, and sorts.
//! 4. [`ContaminationFilter`] drops anything outside the resolved namespaces.
//! 5. [`ResultAssembler`] deduplicates by file and caps at `top_k`.
//!
//! Leg failures degrade to [`RetrievalWarning`]s. Only invalid requests and
//! caller cancellation are [`RetrievalError`]s.

mod assemble;
pub mod backends;
mod clients;
mod config;
mod contamination;
mod dispatch;
mod engine;
mod error;
pub mod fusion;
pub mod planner;
#[doc(hidden)]
pub mod test_support;
mod types;

pub use assemble::ResultAssembler;
pub use clients::{
    Embedding, EmbeddingClient, KeywordHit, KeywordSearchClient, KnowledgeBaseDirectory,
    MetadataFilter, VectorHit, VectorSearchClient,
};
pub use config::{
    DEFAULT_KEYWORD_BASE_SCORE, DEFAULT_KEYWORD_BOOST_FACTOR, DEFAULT_MIN_CONFIDENCE_SCORE,
    DEFAULT_TOP_K, LimitSettings, RetrievalConfig, RetrievalSettings, ScoringSettings,
    TimeoutSettings, load_retrieval_settings, load_retrieval_settings_file,
    load_retrieval_settings_from_paths, retrieval_settings_paths,
};
pub use contamination::ContaminationFilter;
pub use dispatch::{DispatchOutput, LegResult, RetrievalDispatcher};
pub use engine::{RetrievalClients, RetrievalEngine};
pub use error::{ClientError, ConfigError, RetrievalError};
pub use fusion::ScoreFusionEngine;
pub use planner::{QueryPlan, QueryPlanner, resolve_namespaces};
pub use types::{
    MatchedBy, Namespace, NamespaceSet, RankedResult, RetrievalCandidate, RetrievalOutcome,
    RetrievalWarning, RetrieveRequest, ScopeMode, SourceLeg,
};
