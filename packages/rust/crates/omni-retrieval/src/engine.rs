//! Request pipeline: plan, dispatch, fuse, filter, assemble.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::assemble::ResultAssembler;
use crate::clients::{
    EmbeddingClient, KeywordSearchClient, KnowledgeBaseDirectory, VectorSearchClient,
};
use crate::config::RetrievalConfig;
use crate::contamination::ContaminationFilter;
use crate::dispatch::RetrievalDispatcher;
use crate::error::RetrievalError;
use crate::fusion::ScoreFusionEngine;
use crate::planner::QueryPlanner;
use crate::types::{RetrievalOutcome, RetrieveRequest};

/// Shared handles to every external collaborator.
#[derive(Clone)]
pub struct RetrievalClients {
    /// Query embedding service.
    pub embedding: Arc<dyn EmbeddingClient>,
    /// Per-namespace vector store.
    pub vector: Arc<dyn VectorSearchClient>,
    /// Keyword search backend.
    pub keyword: Arc<dyn KeywordSearchClient>,
    /// Knowledge-base ownership lookup.
    pub knowledge_bases: Arc<dyn KnowledgeBaseDirectory>,
}

/// Hybrid retrieval engine. Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct RetrievalEngine {
    config: Arc<RetrievalConfig>,
    planner: QueryPlanner,
    dispatcher: RetrievalDispatcher,
    fusion: ScoreFusionEngine,
}

impl RetrievalEngine {
    /// Build an engine over `clients`.
    ///
    /// # Errors
    ///
    /// [`RetrievalError::Config`] when `config` fails validation.
    pub fn new(clients: RetrievalClients, config: RetrievalConfig) -> Result<Self, RetrievalError> {
        config.validate()?;
        let planner = QueryPlanner::new(clients.knowledge_bases);
        let dispatcher =
            RetrievalDispatcher::new(clients.embedding, clients.vector, clients.keyword, &config);
        let fusion = ScoreFusionEngine::new(&config);
        Ok(Self {
            config: Arc::new(config),
            planner,
            dispatcher,
            fusion,
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Serve one request.
    ///
    /// Leg failures and contamination drops come back as warnings on the
    /// outcome. Only unusable requests and cancellation are errors.
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::Validation`] / [`RetrievalError::InvalidScope`] from planning;
    ///   no external search call is made in that case.
    /// - [`RetrievalError::Cancelled`] if `cancel` fires before assembly.
    pub async fn retrieve(
        &self,
        request: &RetrieveRequest,
        cancel: &CancellationToken,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        let started = Instant::now();
        let planned = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RetrievalError::Cancelled),
            planned = self.planner.plan(request, &self.config) => planned,
        };
        let plan = match planned {
            Ok(plan) => plan,
            Err(error) => {
                tracing::info!(
                    event = "retrieval.request.rejected",
                    scope = %request.scope,
                    tenant_id = %request.tenant_id,
                    error = %error,
                    "retrieval request rejected during planning"
                );
                return Err(error);
            }
        };
        if cancel.is_cancelled() {
            return Err(RetrievalError::Cancelled);
        }

        let dispatched = self.dispatcher.dispatch(&plan, cancel).await?;
        let mut warnings = dispatched.warnings;
        let fused = self.fusion.fuse(dispatched.candidates);
        let (clean, violations) = ContaminationFilter::apply(fused, &plan.namespaces, request.scope);
        warnings.extend(violations);

        if cancel.is_cancelled() {
            return Err(RetrievalError::Cancelled);
        }
        let results = ResultAssembler::assemble(clean, plan.top_k);

        tracing::info!(
            event = "retrieval.request.completed",
            scope = %request.scope,
            tenant_id = %request.tenant_id,
            query_chars = request.query.chars().count(),
            namespaces = plan.namespaces.len(),
            enhanced = plan.query.is_enhanced(),
            results = results.len(),
            warnings = warnings.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "retrieval completed"
        );
        Ok(RetrievalOutcome { results, warnings })
    }

    /// [`retrieve`](Self::retrieve) bounded by an absolute deadline.
    ///
    /// # Errors
    ///
    /// Same as [`retrieve`](Self::retrieve); an elapsed deadline reports
    /// [`RetrievalError::Cancelled`].
    pub async fn retrieve_with_deadline(
        &self,
        request: &RetrieveRequest,
        deadline: tokio::time::Instant,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();
        match tokio::time::timeout_at(deadline, self.retrieve(request, &cancel)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                cancel.cancel();
                tracing::debug!(
                    event = "retrieval.request.deadline_elapsed",
                    scope = %request.scope,
                    "retrieval deadline elapsed"
                );
                Err(RetrievalError::Cancelled)
            }
        }
    }
}
