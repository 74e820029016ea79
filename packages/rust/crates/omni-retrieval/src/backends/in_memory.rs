//! In-memory corpus implementing every search collaborator.
//!
//! Built once from a [`CorpusFile`] and immutable afterwards, so one
//! `Arc<InMemoryCorpus>` can serve as the vector store, keyword backend, and
//! knowledge-base directory for any number of concurrent requests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::clients::{
    KeywordHit, KeywordSearchClient, KnowledgeBaseDirectory, MetadataFilter, VectorHit,
    VectorSearchClient,
};
use crate::error::ClientError;
use crate::types::{Namespace, NamespaceSet};

use super::hash_embedder::HashEmbedder;

/// Compiled keyword patterns are capped to keep hostile input cheap.
const KEYWORD_REGEX_SIZE_LIMIT: usize = 1 << 20;

/// One stored chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusDocument {
    /// Chunk id, unique within its namespace.
    pub id: String,
    /// Partition key (`user:<tenant>`, `system`, `kb:<id>`).
    pub namespace: Namespace,
    /// Source file.
    pub file_identifier: String,
    /// Chunk text.
    pub text: String,
    /// Arbitrary metadata, matched by vector filters.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Ownership and sharing of a named knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseRecord {
    /// Knowledge base id.
    pub id: String,
    /// Owning tenant.
    pub owner: String,
    /// Other tenants allowed to read it.
    #[serde(default)]
    pub shared_with: Vec<String>,
}

/// Serialized corpus, as read by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusFile {
    /// Stored chunks.
    #[serde(default)]
    pub documents: Vec<CorpusDocument>,
    /// Knowledge base registry.
    #[serde(default)]
    pub knowledge_bases: Vec<KnowledgeBaseRecord>,
}

#[derive(Debug, Clone)]
struct IndexedDocument {
    document: CorpusDocument,
    vector: Vec<f32>,
}

/// Immutable in-memory search corpus.
#[derive(Debug, Clone)]
pub struct InMemoryCorpus {
    by_namespace: BTreeMap<Namespace, Vec<IndexedDocument>>,
    knowledge_bases: BTreeMap<String, KnowledgeBaseRecord>,
}

impl InMemoryCorpus {
    /// Index `file`, embedding every chunk with `embed`.
    pub fn build(file: CorpusFile, embed: impl Fn(&str) -> Vec<f32>) -> Self {
        let mut by_namespace: BTreeMap<Namespace, Vec<IndexedDocument>> = BTreeMap::new();
        for document in file.documents {
            let vector = embed(&document.text);
            by_namespace
                .entry(document.namespace.clone())
                .or_default()
                .push(IndexedDocument { document, vector });
        }
        for documents in by_namespace.values_mut() {
            documents.sort_by(|a, b| a.document.id.cmp(&b.document.id));
        }
        let knowledge_bases = file
            .knowledge_bases
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        let corpus = Self {
            by_namespace,
            knowledge_bases,
        };
        tracing::debug!(
            event = "retrieval.corpus.built",
            namespaces = corpus.by_namespace.len(),
            documents = corpus.len(),
            knowledge_bases = corpus.knowledge_bases.len(),
            "in-memory corpus indexed"
        );
        corpus
    }

    /// Index `file` with a [`HashEmbedder`].
    #[must_use]
    pub fn with_hash_embedder(file: CorpusFile, embedder: &HashEmbedder) -> Self {
        Self::build(file, |text| embedder.embed_text(text))
    }

    /// Total number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_namespace.values().map(Vec::len).sum()
    }

    /// True if no chunks are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cosine similarity clamped into `[0, 1]`. Mismatched or zero vectors score `0`.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    let score = dot / (norm_a * norm_b);
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn metadata_matches(metadata: &serde_json::Value, filter: Option<&MetadataFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    filter
        .iter()
        .all(|(key, expected)| metadata.get(key) == Some(expected))
}

#[async_trait]
impl VectorSearchClient for InMemoryCorpus {
    async fn query(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorHit>, ClientError> {
        let Some(documents) = self.by_namespace.get(namespace) else {
            return Ok(Vec::new());
        };
        let mut scored: Vec<(f32, &CorpusDocument)> = documents
            .iter()
            .filter(|indexed| metadata_matches(&indexed.document.metadata, filter))
            .map(|indexed| (cosine_similarity(vector, &indexed.vector), &indexed.document))
            .collect();
        scored.sort_by(|(sa, da), (sb, db)| sb.total_cmp(sa).then_with(|| da.id.cmp(&db.id)));
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, document)| VectorHit {
                id: document.id.clone(),
                namespace: document.namespace.clone(),
                score,
                text: document.text.clone(),
                file_identifier: document.file_identifier.clone(),
                metadata: document.metadata.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl KeywordSearchClient for InMemoryCorpus {
    async fn query(
        &self,
        namespaces: &NamespaceSet,
        pattern: &str,
        limit: usize,
    ) -> Result<Vec<KeywordHit>, ClientError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(KEYWORD_REGEX_SIZE_LIMIT)
            .build()
            .map_err(|error| ClientError::Malformed(format!("invalid keyword pattern: {error}")))?;
        Ok(namespaces
            .iter()
            .filter_map(|namespace| self.by_namespace.get(namespace))
            .flatten()
            .filter(|indexed| regex.is_match(&indexed.document.text))
            .take(limit)
            .map(|indexed| KeywordHit {
                id: indexed.document.id.clone(),
                namespace: indexed.document.namespace.clone(),
                snippet: indexed.document.text.clone(),
                file_identifier: indexed.document.file_identifier.clone(),
                metadata: indexed.document.metadata.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl KnowledgeBaseDirectory for InMemoryCorpus {
    async fn is_visible(&self, tenant_id: &str, kb_id: &str) -> Result<bool, ClientError> {
        Ok(self.knowledge_bases.get(kb_id).is_some_and(|record| {
            record.owner == tenant_id || record.shared_with.iter().any(|t| t == tenant_id)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, namespace: Namespace, file: &str, text: &str) -> CorpusDocument {
        CorpusDocument {
            id: id.to_string(),
            namespace,
            file_identifier: file.to_string(),
            text: text.to_string(),
            metadata: serde_json::json!({ "lang": "en" }),
        }
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[1.0], &[1.0, 0.0]).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).abs() < f32::EPSILON);
    }

    #[test]
    fn test_metadata_filter_requires_all_keys() {
        let metadata = serde_json::json!({ "lang": "en", "team": "hr" });
        let mut filter = MetadataFilter::new();
        filter.insert("lang".to_string(), serde_json::json!("en"));
        assert!(metadata_matches(&metadata, Some(&filter)));
        filter.insert("team".to_string(), serde_json::json!("eng"));
        assert!(!metadata_matches(&metadata, Some(&filter)));
        assert!(metadata_matches(&metadata, None));
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_malformed() {
        let corpus = InMemoryCorpus::with_hash_embedder(
            CorpusFile {
                documents: vec![doc("a", Namespace::system(), "a.md", "text")],
                knowledge_bases: Vec::new(),
            },
            &HashEmbedder::default(),
        );
        let namespaces: NamespaceSet = std::iter::once(Namespace::system()).collect();
        let err = KeywordSearchClient::query(&corpus, &namespaces, "(unclosed", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Malformed(_)));
    }
}
