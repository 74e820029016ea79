//! Typed, validated retrieval configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// Default score floor below which candidates are dropped.
pub const DEFAULT_MIN_CONFIDENCE_SCORE: f32 = 0.3;
/// Default multiplier for candidates matched by both legs.
pub const DEFAULT_KEYWORD_BOOST_FACTOR: f32 = 1.5;
/// Default score assigned to keyword-only matches.
pub const DEFAULT_KEYWORD_BASE_SCORE: f32 = 0.5;
/// Default number of results returned.
pub const DEFAULT_TOP_K: usize = 5;

const DEFAULT_MAX_TOP_K: usize = 50;
const DEFAULT_VECTOR_TOP_K: usize = 20;
const DEFAULT_KEYWORD_LIMIT: usize = 50;
const DEFAULT_SPAN_OVERLAP_THRESHOLD: f32 = 0.5;
const DEFAULT_EMBED_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_VECTOR_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_KEYWORD_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_DIRECTORY_TIMEOUT_MS: u64 = 2_000;

/// Engine configuration. Build with [`Default`] or from
/// [`RetrievalSettings`](super::RetrievalSettings), then [`validate`](Self::validate).
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    /// Candidates with a fused score below this are dropped.
    pub min_confidence_score: f32,
    /// Multiplier applied to the vector score when both legs agree (> 1.0).
    pub keyword_boost_factor: f32,
    /// Fixed score for keyword-only matches.
    pub keyword_base_score: f32,
    /// Default result count.
    pub top_k: usize,
    /// Upper bound for per-request `top_k` overrides.
    pub max_top_k: usize,
    /// Hits requested from each vector namespace.
    pub vector_top_k: usize,
    /// Hits requested from the keyword leg.
    pub keyword_limit: usize,
    /// Token-overlap ratio at which two snippets of one file count as the same span.
    pub span_overlap_threshold: f32,
    /// Deadline for the embedding call.
    pub embed_timeout: Duration,
    /// Deadline for each per-namespace vector query.
    pub vector_timeout: Duration,
    /// Deadline for the keyword query.
    pub keyword_timeout: Duration,
    /// Deadline for the knowledge-base visibility lookup. Elapsing fails closed.
    pub directory_timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            min_confidence_score: DEFAULT_MIN_CONFIDENCE_SCORE,
            keyword_boost_factor: DEFAULT_KEYWORD_BOOST_FACTOR,
            keyword_base_score: DEFAULT_KEYWORD_BASE_SCORE,
            top_k: DEFAULT_TOP_K,
            max_top_k: DEFAULT_MAX_TOP_K,
            vector_top_k: DEFAULT_VECTOR_TOP_K,
            keyword_limit: DEFAULT_KEYWORD_LIMIT,
            span_overlap_threshold: DEFAULT_SPAN_OVERLAP_THRESHOLD,
            embed_timeout: Duration::from_millis(DEFAULT_EMBED_TIMEOUT_MS),
            vector_timeout: Duration::from_millis(DEFAULT_VECTOR_TIMEOUT_MS),
            keyword_timeout: Duration::from_millis(DEFAULT_KEYWORD_TIMEOUT_MS),
            directory_timeout: Duration::from_millis(DEFAULT_DIRECTORY_TIMEOUT_MS),
        }
    }
}

impl RetrievalConfig {
    /// Check every value is in range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.keyword_boost_factor > 1.0 && self.keyword_boost_factor.is_finite()) {
            return Err(ConfigError::BoostFactor(self.keyword_boost_factor));
        }
        for (field, value) in [
            ("min_confidence_score", self.min_confidence_score),
            ("keyword_base_score", self.keyword_base_score),
            ("span_overlap_threshold", self.span_overlap_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ScoreRange { field, value });
            }
        }
        for (field, value) in [
            ("top_k", self.top_k),
            ("max_top_k", self.max_top_k),
            ("vector_top_k", self.vector_top_k),
            ("keyword_limit", self.keyword_limit),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroCount(field));
            }
        }
        if self.top_k > self.max_top_k {
            return Err(ConfigError::TopKAboveMax {
                top_k: self.top_k,
                max_top_k: self.max_top_k,
            });
        }
        for (field, value) in [
            ("embed_timeout", self.embed_timeout),
            ("vector_timeout", self.vector_timeout),
            ("keyword_timeout", self.keyword_timeout),
            ("directory_timeout", self.directory_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroTimeout(field));
            }
        }
        Ok(())
    }

    /// Resolve the effective result count for a request.
    #[must_use]
    pub fn effective_top_k(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.top_k).min(self.max_top_k)
    }
}
