//! FNV-1a feature-hashing embedder.
//!
//! Lexical, deterministic, and always available. Each lowercase alphanumeric
//! token is hashed into one of `dimension` buckets with a hash-derived sign,
//! then the vector is L2-normalized. Texts sharing tokens get positive cosine
//! similarity; it carries no semantics beyond that.

use async_trait::async_trait;

use crate::clients::{Embedding, EmbeddingClient};
use crate::error::ClientError;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Default vector width.
pub const DEFAULT_HASH_DIMENSION: usize = 256;

/// 64-bit FNV-1a.
#[must_use]
pub fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Feature-hashing embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_HASH_DIMENSION,
        }
    }
}

impl HashEmbedder {
    /// Embedder with `dimension` buckets (at least 1).
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Model id reported with every embedding.
    #[must_use]
    pub fn model_id(&self) -> String {
        format!("fnv1a-{}", self.dimension)
    }

    /// Embed synchronously. Text without tokens yields the zero vector.
    #[must_use]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        let buckets = u64::try_from(self.dimension).unwrap_or(u64::MAX);
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let bucket = usize::try_from(hash % buckets).unwrap_or(0);
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, ClientError> {
        Ok(Embedding {
            vector: self.embed_text(text),
            model_id: self.model_id(),
        })
    }
}
