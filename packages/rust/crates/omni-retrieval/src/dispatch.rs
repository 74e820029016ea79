//! Concurrent retrieval legs with per-leg failure isolation.
//!
//! One request fans out into N vector sub-queries (one per namespace, after a
//! single embedding call) plus one keyword sub-query, all polled concurrently
//! and joined before fusion. Each sub-query yields an explicit
//! `Result<Vec<RetrievalCandidate>, RetrievalWarning>`; failures degrade to
//! warnings and never cancel siblings. Caller cancellation drops every
//! in-flight sub-query and discards partial results.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::clients::{
    EmbeddingClient, KeywordHit, KeywordSearchClient, VectorHit, VectorSearchClient,
};
use crate::config::RetrievalConfig;
use crate::error::{ClientError, RetrievalError};
use crate::planner::QueryPlan;
use crate::types::{
    MatchedBy, Namespace, NamespaceSet, RetrievalCandidate, RetrievalWarning, SourceLeg,
};

/// Score given to a keyword match before fusion; keyword matching is boolean.
const KEYWORD_MATCH_RAW_SCORE: f32 = 1.0;

/// Outcome of a single sub-query.
pub type LegResult = Result<Vec<RetrievalCandidate>, RetrievalWarning>;

/// Candidates from every leg plus the warnings raised while collecting them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutput {
    /// Unfused candidates from all successful sub-queries.
    pub candidates: Vec<RetrievalCandidate>,
    /// One entry per failed or skipped sub-query (plus `NoResults` when empty).
    pub warnings: Vec<RetrievalWarning>,
}

/// Runs the vector and keyword legs for one plan.
#[derive(Clone)]
pub struct RetrievalDispatcher {
    embedding: Arc<dyn EmbeddingClient>,
    vector: Arc<dyn VectorSearchClient>,
    keyword: Arc<dyn KeywordSearchClient>,
    vector_top_k: usize,
    keyword_limit: usize,
    embed_timeout: Duration,
    vector_timeout: Duration,
    keyword_timeout: Duration,
}

impl RetrievalDispatcher {
    /// Create a dispatcher over shared client handles.
    pub fn new(
        embedding: Arc<dyn EmbeddingClient>,
        vector: Arc<dyn VectorSearchClient>,
        keyword: Arc<dyn KeywordSearchClient>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            embedding,
            vector,
            keyword,
            vector_top_k: config.vector_top_k,
            keyword_limit: config.keyword_limit,
            embed_timeout: config.embed_timeout,
            vector_timeout: config.vector_timeout,
            keyword_timeout: config.keyword_timeout,
        }
    }

    /// Run both legs for `plan` and collect their candidates.
    ///
    /// # Errors
    ///
    /// [`RetrievalError::Cancelled`] if `cancel` fires before every leg finished.
    /// Leg failures are reported in [`DispatchOutput::warnings`], never as errors.
    pub async fn dispatch(
        &self,
        plan: &QueryPlan,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutput, RetrievalError> {
        let started = Instant::now();
        let embed_text = plan.query.text();
        let legs = async {
            tokio::join!(
                self.vector_leg(&embed_text, &plan.namespaces),
                self.keyword_leg(plan.keyword_pattern.as_deref(), &plan.namespaces),
            )
        };

        let (vector_results, keyword_result) = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(
                    event = "retrieval.dispatch.cancelled",
                    elapsed_ms = started.elapsed().as_millis(),
                    "retrieval legs cancelled by caller; discarding partial results"
                );
                return Err(RetrievalError::Cancelled);
            }
            results = legs => results,
        };

        let mut output = DispatchOutput::default();
        for result in vector_results.into_iter().chain(std::iter::once(keyword_result)) {
            match result {
                Ok(candidates) => output.candidates.extend(candidates),
                Err(warning) => output.warnings.push(warning),
            }
        }
        if output.candidates.is_empty() {
            tracing::warn!(
                event = "retrieval.dispatch.no_results",
                namespaces = plan.namespaces.len(),
                failures = output.warnings.len(),
                "no candidates from any retrieval leg"
            );
            output.warnings.push(RetrievalWarning::NoResults);
        }

        tracing::debug!(
            event = "retrieval.dispatch.completed",
            candidates = output.candidates.len(),
            warnings = output.warnings.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "retrieval legs joined"
        );
        Ok(output)
    }

    /// Embed once, then query every namespace concurrently.
    async fn vector_leg(&self, text: &str, namespaces: &NamespaceSet) -> Vec<LegResult> {
        let embedding = match with_timeout(self.embed_timeout, self.embedding.embed(text)).await
        {
            Ok(embedding) if embedding.vector.is_empty() => Err(ClientError::Malformed(
                "embedding vector is empty".to_string(),
            )),
            Ok(embedding) if embedding.vector.iter().any(|v| !v.is_finite()) => Err(
                ClientError::Malformed("embedding vector has non-finite values".to_string()),
            ),
            other => other,
        };
        let embedding = match embedding {
            Ok(embedding) => embedding,
            Err(error) => {
                tracing::warn!(
                    event = "retrieval.dispatch.embedding_failed",
                    error = %error,
                    query_chars = text.chars().count(),
                    "embedding failed; degrading to keyword-only retrieval"
                );
                return vec![Err(RetrievalWarning::EmbeddingFailure {
                    reason: error.to_string(),
                })];
            }
        };
        tracing::debug!(
            event = "retrieval.dispatch.embedded",
            model_id = %embedding.model_id,
            dimension = embedding.vector.len(),
            "query embedded"
        );

        let vector = embedding.vector.as_slice();
        join_all(
            namespaces
                .iter()
                .map(|namespace| self.query_namespace(namespace, vector)),
        )
        .await
    }

    async fn query_namespace(&self, namespace: &Namespace, vector: &[f32]) -> LegResult {
        let started = Instant::now();
        let result = with_timeout(
            self.vector_timeout,
            self.vector.query(namespace, vector, self.vector_top_k, None),
        )
        .await;
        match result {
            Ok(hits) => {
                tracing::debug!(
                    event = "retrieval.dispatch.vector_namespace_done",
                    namespace = %namespace,
                    hits = hits.len(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "vector namespace query completed"
                );
                Ok(hits.into_iter().filter_map(vector_candidate).collect())
            }
            Err(error) => {
                tracing::warn!(
                    event = "retrieval.dispatch.vector_namespace_failed",
                    namespace = %namespace,
                    error = %error,
                    elapsed_ms = started.elapsed().as_millis(),
                    "vector query failed; namespace contributes no candidates"
                );
                Err(RetrievalWarning::VectorLegFailure {
                    namespace: namespace.clone(),
                    reason: error.to_string(),
                })
            }
        }
    }

    async fn keyword_leg(&self, pattern: Option<&str>, namespaces: &NamespaceSet) -> LegResult {
        let Some(pattern) = pattern else {
            tracing::debug!(
                event = "retrieval.dispatch.keyword_skipped",
                "query has no searchable keyword terms; keyword leg skipped"
            );
            return Err(RetrievalWarning::KeywordLegFailure {
                reason: "no searchable terms in query".to_string(),
            });
        };
        let started = Instant::now();
        let result = with_timeout(
            self.keyword_timeout,
            self.keyword.query(namespaces, pattern, self.keyword_limit),
        )
        .await;
        match result {
            Ok(hits) => {
                tracing::debug!(
                    event = "retrieval.dispatch.keyword_done",
                    hits = hits.len(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "keyword query completed"
                );
                Ok(hits.into_iter().map(keyword_candidate).collect())
            }
            Err(error) => {
                tracing::warn!(
                    event = "retrieval.dispatch.keyword_failed",
                    error = %error,
                    elapsed_ms = started.elapsed().as_millis(),
                    "keyword query failed; degrading to vector-only retrieval"
                );
                Err(RetrievalWarning::KeywordLegFailure {
                    reason: error.to_string(),
                })
            }
        }
    }
}

async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout(limit)),
    }
}

/// Non-finite similarities are dropped; the rest are clamped into `[0, 1]`.
fn vector_candidate(hit: VectorHit) -> Option<RetrievalCandidate> {
    if !hit.score.is_finite() {
        tracing::debug!(
            event = "retrieval.dispatch.vector_hit_dropped",
            id = %hit.id,
            "vector hit has non-finite score; dropped"
        );
        return None;
    }
    let score = hit.score.clamp(0.0, 1.0);
    Some(RetrievalCandidate {
        id: hit.id,
        namespace: hit.namespace,
        source_leg: SourceLeg::Vector,
        raw_score: score,
        final_score: score,
        matched_by: MatchedBy::Vector,
        text: hit.text,
        file_identifier: hit.file_identifier,
        metadata: hit.metadata,
    })
}

fn keyword_candidate(hit: KeywordHit) -> RetrievalCandidate {
    RetrievalCandidate {
        id: hit.id,
        namespace: hit.namespace,
        source_leg: SourceLeg::Keyword,
        raw_score: KEYWORD_MATCH_RAW_SCORE,
        final_score: KEYWORD_MATCH_RAW_SCORE,
        matched_by: MatchedBy::Keyword,
        text: hit.snippet,
        file_identifier: hit.file_identifier,
        metadata: hit.metadata,
    }
}
