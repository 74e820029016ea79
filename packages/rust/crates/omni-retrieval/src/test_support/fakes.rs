use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::clients::{
    Embedding, EmbeddingClient, KeywordHit, KeywordSearchClient, KnowledgeBaseDirectory,
    MetadataFilter, VectorHit, VectorSearchClient,
};
use crate::error::ClientError;
use crate::types::{Namespace, NamespaceSet};

fn record<T>(log: &Mutex<Vec<T>>, value: T) {
    if let Ok(mut guard) = log.lock() {
        guard.push(value);
    }
}

fn snapshot<T: Clone>(log: &Mutex<Vec<T>>) -> Vec<T> {
    log.lock().map(|guard| guard.clone()).unwrap_or_default()
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

// ============================================================================
// Embedding
// ============================================================================

pub struct ScriptedEmbedder {
    outcome: Result<Vec<f32>, ClientError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl ScriptedEmbedder {
    pub fn returning(vector: Vec<f32>) -> Self {
        Self {
            outcome: Ok(vector),
            delay: None,
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ClientError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::returning(Vec::new())
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts(&self) -> Vec<String> {
        snapshot(&self.texts)
    }
}

#[async_trait]
impl EmbeddingClient for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        record(&self.texts, text.to_string());
        pause(self.delay).await;
        self.outcome.clone().map(|vector| Embedding {
            vector,
            model_id: "scripted".to_string(),
        })
    }
}

// ============================================================================
// Vector store
// ============================================================================

/// Per-namespace scripted vector store.
///
/// Namespaces without a script answer with no hits. Injected hits are
/// appended to every successful answer regardless of namespace, simulating a
/// backend that leaks foreign data.
#[derive(Default)]
pub struct ScriptedVectorStore {
    hits: BTreeMap<Namespace, Vec<VectorHit>>,
    failures: BTreeMap<Namespace, ClientError>,
    delays: BTreeMap<Namespace, Duration>,
    injected: Vec<VectorHit>,
    calls: AtomicUsize,
    queried: Mutex<Vec<Namespace>>,
}

impl ScriptedVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_hits(mut self, namespace: &Namespace, hits: Vec<VectorHit>) -> Self {
        self.hits.entry(namespace.clone()).or_default().extend(hits);
        self
    }

    #[must_use]
    pub fn failing(mut self, namespace: &Namespace, error: ClientError) -> Self {
        self.failures.insert(namespace.clone(), error);
        self
    }

    #[must_use]
    pub fn delayed(mut self, namespace: &Namespace, delay: Duration) -> Self {
        self.delays.insert(namespace.clone(), delay);
        self
    }

    #[must_use]
    pub fn injecting(mut self, hit: VectorHit) -> Self {
        self.injected.push(hit);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queried(&self) -> Vec<Namespace> {
        let mut namespaces = snapshot(&self.queried);
        namespaces.sort();
        namespaces
    }
}

#[async_trait]
impl VectorSearchClient for ScriptedVectorStore {
    async fn query(
        &self,
        namespace: &Namespace,
        _vector: &[f32],
        top_k: usize,
        _filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorHit>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        record(&self.queried, namespace.clone());
        pause(self.delays.get(namespace).copied()).await;
        if let Some(error) = self.failures.get(namespace) {
            return Err(error.clone());
        }
        let mut hits: Vec<VectorHit> = self
            .hits
            .get(namespace)
            .map(|hits| hits.iter().take(top_k).cloned().collect())
            .unwrap_or_default();
        hits.extend(self.injected.iter().cloned());
        Ok(hits)
    }
}

// ============================================================================
// Keyword search
// ============================================================================

/// Scripted keyword backend.
///
/// Stored hits are filtered to the requested namespaces like a real backend;
/// injected hits are returned unfiltered.
#[derive(Default)]
pub struct ScriptedKeywordSearch {
    hits: Vec<KeywordHit>,
    injected: Vec<KeywordHit>,
    failure: Option<ClientError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    patterns: Mutex<Vec<String>>,
}

impl ScriptedKeywordSearch {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_hits(mut self, hits: Vec<KeywordHit>) -> Self {
        self.hits.extend(hits);
        self
    }

    #[must_use]
    pub fn injecting(mut self, hit: KeywordHit) -> Self {
        self.injected.push(hit);
        self
    }

    #[must_use]
    pub fn failing(mut self, error: ClientError) -> Self {
        self.failure = Some(error);
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn patterns(&self) -> Vec<String> {
        snapshot(&self.patterns)
    }
}

#[async_trait]
impl KeywordSearchClient for ScriptedKeywordSearch {
    async fn query(
        &self,
        namespaces: &NamespaceSet,
        pattern: &str,
        limit: usize,
    ) -> Result<Vec<KeywordHit>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        record(&self.patterns, pattern.to_string());
        pause(self.delay).await;
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let mut hits: Vec<KeywordHit> = self
            .hits
            .iter()
            .filter(|hit| namespaces.contains(&hit.namespace))
            .take(limit)
            .cloned()
            .collect();
        hits.extend(self.injected.iter().cloned());
        Ok(hits)
    }
}

// ============================================================================
// Knowledge-base directory
// ============================================================================

#[derive(Default)]
pub struct StaticDirectory {
    grants: BTreeSet<(String, String)>,
    failure: Option<ClientError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn granting(mut self, tenant_id: &str, kb_id: &str) -> Self {
        self.grants
            .insert((tenant_id.to_string(), kb_id.to_string()));
        self
    }

    #[must_use]
    pub fn failing(mut self, error: ClientError) -> Self {
        self.failure = Some(error);
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeBaseDirectory for StaticDirectory {
    async fn is_visible(&self, tenant_id: &str, kb_id: &str) -> Result<bool, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        pause(self.delay).await;
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(self
            .grants
            .contains(&(tenant_id.to_string(), kb_id.to_string())))
    }
}
