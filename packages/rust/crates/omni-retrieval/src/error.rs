//! Error types for retrieval operations.
//!
//! Only request-shape problems and caller cancellation surface as
//! [`RetrievalError`]. Collaborator failures are [`ClientError`] values that the
//! dispatcher downgrades into warnings.

use std::time::Duration;

use thiserror::Error;

/// Errors returned to the caller of `RetrievalEngine::retrieve`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    /// Scope could not be resolved for this tenant (missing or foreign knowledge base).
    #[error("Invalid scope: {reason}")]
    InvalidScope {
        /// Why the scope was rejected.
        reason: String,
    },

    /// Request is malformed (empty query, bad identifier, zero `top_k`).
    #[error("Validation error on `{field}`: {message}")]
    Validation {
        /// Offending request field.
        field: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// The caller cancelled the request (or its deadline elapsed) before assembly.
    #[error("Retrieval cancelled")]
    Cancelled,

    /// Engine configuration is out of range.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RetrievalError {
    pub(crate) fn invalid_scope(reason: impl Into<String>) -> Self {
        Self::InvalidScope {
            reason: reason.into(),
        }
    }

    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Rejected configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Keyword boost must strictly increase scores.
    #[error("keyword_boost_factor must be > 1.0, got {0}")]
    BoostFactor(f32),

    /// A score-space value fell outside `[0, 1]`.
    #[error("{field} must be within [0, 1], got {value}")]
    ScoreRange {
        /// Setting name.
        field: &'static str,
        /// Supplied value.
        value: f32,
    },

    /// A count setting was zero.
    #[error("{0} must be greater than 0")]
    ZeroCount(&'static str),

    /// A timeout setting was zero.
    #[error("{0} must be a non-zero duration")]
    ZeroTimeout(&'static str),

    /// `top_k` exceeds `max_top_k`.
    #[error("top_k ({top_k}) exceeds max_top_k ({max_top_k})")]
    TopKAboveMax {
        /// Default result count.
        top_k: usize,
        /// Hard cap.
        max_top_k: usize,
    },
}

/// Failure reported by an external collaborator (embedding, vector, keyword, directory).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Call exceeded its deadline.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Upstream quota or rate limit hit.
    #[error("rate limited")]
    RateLimited,

    /// Upstream answered with something unusable.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Transport or backend error.
    #[error("unavailable: {0}")]
    Unavailable(String),
}
