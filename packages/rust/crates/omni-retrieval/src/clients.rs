//! Narrow interfaces to the external services the engine consumes.
//!
//! Handles are long-lived and shared across concurrent requests, so every
//! trait is `Send + Sync` and takes `&self`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::types::{Namespace, NamespaceSet};

/// Metadata equality filter forwarded to the vector store.
pub type MetadataFilter = serde_json::Map<String, serde_json::Value>;

/// Output of one embedding call.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// Dense query vector.
    pub vector: Vec<f32>,
    /// Model that produced it.
    pub model_id: String,
}

/// One nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    /// Chunk id.
    pub id: String,
    /// Namespace the store holds this chunk under.
    pub namespace: Namespace,
    /// Similarity normalized to `[0, 1]`.
    pub score: f32,
    /// Chunk text.
    pub text: String,
    /// Source file.
    pub file_identifier: String,
    /// Store metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// One keyword match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordHit {
    /// Chunk id.
    pub id: String,
    /// Namespace the store holds this chunk under.
    pub namespace: Namespace,
    /// Matched snippet.
    pub snippet: String,
    /// Source file.
    pub file_identifier: String,
    /// Store metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Text → vector.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed one query string.
    async fn embed(&self, text: &str) -> Result<Embedding, ClientError>;
}

/// Per-namespace nearest-neighbor search.
#[async_trait]
pub trait VectorSearchClient: Send + Sync {
    /// Return up to `top_k` hits from `namespace`.
    async fn query(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorHit>, ClientError>;
}

/// Literal/regex search over stored text.
#[async_trait]
pub trait KeywordSearchClient: Send + Sync {
    /// Return up to `limit` chunks in `namespaces` whose text matches `pattern`.
    ///
    /// `pattern` is a regex whose literal parts are already escaped; it is
    /// matched case-insensitively.
    async fn query(
        &self,
        namespaces: &NamespaceSet,
        pattern: &str,
        limit: usize,
    ) -> Result<Vec<KeywordHit>, ClientError>;
}

/// Ownership/visibility of named knowledge bases.
#[async_trait]
pub trait KnowledgeBaseDirectory: Send + Sync {
    /// True if `tenant_id` may read `kb_id`. Unknown knowledge bases are not visible.
    async fn is_visible(&self, tenant_id: &str, kb_id: &str) -> Result<bool, ClientError>;
}
