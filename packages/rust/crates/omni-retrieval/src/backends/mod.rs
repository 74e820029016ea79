//! Reference collaborator implementations.
//!
//! - [`InMemoryCorpus`]: vector store, keyword backend, and knowledge-base directory.
//! - [`HashEmbedder`]: deterministic lexical embedder.
//! - [`HttpEmbeddingClient`]: remote `/embed/batch` service.

mod hash_embedder;
mod http_embedding;
mod in_memory;

pub use hash_embedder::{DEFAULT_HASH_DIMENSION, HashEmbedder, fnv1a};
pub use http_embedding::{HttpEmbeddingClient, classify_status, parse_embed_response};
pub use in_memory::{
    CorpusDocument, CorpusFile, InMemoryCorpus, KnowledgeBaseRecord, cosine_similarity,
};
