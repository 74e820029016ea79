use std::sync::Arc;

use crate::clients::{KeywordHit, VectorHit};
use crate::engine::RetrievalClients;
use crate::types::Namespace;

use super::fakes::{ScriptedEmbedder, ScriptedKeywordSearch, ScriptedVectorStore, StaticDirectory};

pub fn vector_hit(id: &str, namespace: &Namespace, file: &str, score: f32, text: &str) -> VectorHit {
    VectorHit {
        id: id.to_string(),
        namespace: namespace.clone(),
        score,
        text: text.to_string(),
        file_identifier: file.to_string(),
        metadata: serde_json::Value::Null,
    }
}

pub fn keyword_hit(id: &str, namespace: &Namespace, file: &str, snippet: &str) -> KeywordHit {
    KeywordHit {
        id: id.to_string(),
        namespace: namespace.clone(),
        snippet: snippet.to_string(),
        file_identifier: file.to_string(),
        metadata: serde_json::Value::Null,
    }
}

/// Typed handles to the fakes behind a [`RetrievalClients`].
#[derive(Clone)]
pub struct ScriptedClients {
    pub embedder: Arc<ScriptedEmbedder>,
    pub vector: Arc<ScriptedVectorStore>,
    pub keyword: Arc<ScriptedKeywordSearch>,
    pub directory: Arc<StaticDirectory>,
}

impl ScriptedClients {
    pub fn new(
        embedder: ScriptedEmbedder,
        vector: ScriptedVectorStore,
        keyword: ScriptedKeywordSearch,
        directory: StaticDirectory,
    ) -> Self {
        Self {
            embedder: Arc::new(embedder),
            vector: Arc::new(vector),
            keyword: Arc::new(keyword),
            directory: Arc::new(directory),
        }
    }

    pub fn clients(&self) -> RetrievalClients {
        RetrievalClients {
            embedding: self.embedder.clone(),
            vector: self.vector.clone(),
            keyword: self.keyword.clone(),
            knowledge_bases: self.directory.clone(),
        }
    }

    /// Calls made to the embedding, vector, and keyword fakes combined.
    pub fn search_calls(&self) -> usize {
        self.embedder.calls() + self.vector.calls() + self.keyword.calls()
    }
}
