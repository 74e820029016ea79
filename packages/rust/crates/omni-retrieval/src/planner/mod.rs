//! Query planning: request validation, scope → namespace resolution, and
//! query enhancement.
//!
//! Planning fails fast. A request that cannot be planned never reaches the
//! embedding, vector, or keyword services.

pub mod enhance;
pub mod pattern;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::clients::KnowledgeBaseDirectory;
use crate::config::RetrievalConfig;
use crate::error::{ClientError, RetrievalError};
use crate::types::{Namespace, NamespaceSet, RetrieveRequest, ScopeMode};

pub use enhance::{ContactIntent, EnhancedQuery, detect_contact_intent, enhance_query};
pub use pattern::{content_terms, escape_literal, keyword_pattern};

/// Max query length in chars.
pub const MAX_QUERY_CHARS: usize = 4096;
/// Max identifier length in bytes.
const MAX_IDENTIFIER_LEN: usize = 128;

/// Everything the dispatcher needs for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    /// Namespaces eligible for this request.
    pub namespaces: NamespaceSet,
    /// Query after enhancement.
    pub query: EnhancedQuery,
    /// Escaped keyword pattern; `None` when the query has no searchable terms.
    pub keyword_pattern: Option<String>,
    /// Effective result cap.
    pub top_k: usize,
}

/// Resolves scope and enhances queries.
#[derive(Clone)]
pub struct QueryPlanner {
    directory: Arc<dyn KnowledgeBaseDirectory>,
}

impl QueryPlanner {
    /// Create a planner backed by `directory` for knowledge-base visibility checks.
    pub fn new(directory: Arc<dyn KnowledgeBaseDirectory>) -> Self {
        Self { directory }
    }

    /// Validate `request` and build its [`QueryPlan`].
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::Validation`] for malformed input.
    /// - [`RetrievalError::InvalidScope`] when the scope cannot be resolved for the tenant.
    pub async fn plan(
        &self,
        request: &RetrieveRequest,
        config: &RetrievalConfig,
    ) -> Result<QueryPlan, RetrievalError> {
        validate_request(request)?;
        let tenant_id = request.tenant_id.trim();
        let kb_id = request.kb_id.as_deref().map(str::trim);
        let namespaces = resolve_namespaces(request.scope, tenant_id, kb_id)?;

        if request.scope == ScopeMode::SpecificKb {
            // resolve_namespaces already rejected a missing id.
            let kb_id = kb_id.unwrap_or_default();
            self.ensure_visible(tenant_id, kb_id, config.directory_timeout)
                .await?;
        } else if kb_id.is_some() {
            tracing::debug!(
                event = "retrieval.plan.kb_id_ignored",
                scope = %request.scope,
                "kb_id supplied for a scope that does not use it; ignoring"
            );
        }

        let query = enhance_query(request.query.trim());
        let keyword_pattern = keyword_pattern(&query);
        let top_k = config.effective_top_k(request.top_k);

        tracing::debug!(
            event = "retrieval.plan.completed",
            scope = %request.scope,
            namespaces = namespaces.len(),
            enhanced = query.is_enhanced(),
            has_keyword_pattern = keyword_pattern.is_some(),
            top_k,
            "query planned"
        );

        Ok(QueryPlan {
            namespaces,
            query,
            keyword_pattern,
            top_k,
        })
    }

    async fn ensure_visible(
        &self,
        tenant_id: &str,
        kb_id: &str,
        limit: Duration,
    ) -> Result<(), RetrievalError> {
        let lookup = tokio::time::timeout(limit, self.directory.is_visible(tenant_id, kb_id))
            .await
            .unwrap_or(Err(ClientError::Timeout(limit)));
        match lookup {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::warn!(
                    event = "retrieval.plan.kb_not_visible",
                    tenant_id,
                    kb_id,
                    "knowledge base not owned by or shared with tenant"
                );
                Err(RetrievalError::invalid_scope(format!(
                    "knowledge base `{kb_id}` is not visible to tenant `{tenant_id}`"
                )))
            }
            Err(error) => {
                tracing::warn!(
                    event = "retrieval.plan.directory_failed",
                    tenant_id,
                    kb_id,
                    error = %error,
                    "knowledge base directory lookup failed; refusing scope"
                );
                Err(RetrievalError::invalid_scope(format!(
                    "could not verify access to knowledge base `{kb_id}`: {error}"
                )))
            }
        }
    }
}

/// Map a scope mode to its namespace set.
///
/// Visibility of a specific knowledge base is checked separately by
/// [`QueryPlanner::plan`].
///
/// # Errors
///
/// [`RetrievalError::InvalidScope`] when `SpecificKb` has no `kb_id`.
pub fn resolve_namespaces(
    scope: ScopeMode,
    tenant_id: &str,
    kb_id: Option<&str>,
) -> Result<NamespaceSet, RetrievalError> {
    let mut namespaces = NamespaceSet::new();
    match scope {
        ScopeMode::Unified => {
            namespaces.insert(Namespace::personal(tenant_id));
            namespaces.insert(Namespace::system());
        }
        ScopeMode::UserOnly => {
            namespaces.insert(Namespace::personal(tenant_id));
        }
        ScopeMode::SystemOnly => {
            namespaces.insert(Namespace::system());
        }
        ScopeMode::SpecificKb => {
            let kb_id = kb_id.filter(|id| !id.is_empty()).ok_or_else(|| {
                RetrievalError::invalid_scope("specific_kb scope requires a kb_id")
            })?;
            namespaces.insert(Namespace::knowledge_base(kb_id));
        }
    }
    Ok(namespaces)
}

fn validate_request(request: &RetrieveRequest) -> Result<(), RetrievalError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(RetrievalError::validation("query", "query must not be empty"));
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(RetrievalError::validation(
            "query",
            format!("query exceeds {MAX_QUERY_CHARS} characters"),
        ));
    }
    validate_identifier("tenant_id", request.tenant_id.trim())?;
    if let Some(kb_id) = request.kb_id.as_deref().map(str::trim)
        && !kb_id.is_empty()
    {
        validate_identifier("kb_id", kb_id)?;
    }
    if request.top_k == Some(0) {
        return Err(RetrievalError::validation(
            "top_k",
            "top_k must be greater than 0",
        ));
    }
    Ok(())
}

/// Identifiers become part of namespace keys, so only a conservative
/// character set is accepted.
fn validate_identifier(field: &'static str, value: &str) -> Result<(), RetrievalError> {
    if value.is_empty() {
        return Err(RetrievalError::validation(field, "must not be empty"));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(RetrievalError::validation(
            field,
            format!("must be at most {MAX_IDENTIFIER_LEN} bytes"),
        ));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(RetrievalError::validation(
            field,
            "may only contain ASCII letters, digits, '_', '-', '.'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_each_scope() {
        let unified = resolve_namespaces(ScopeMode::Unified, "alice", None).unwrap();
        assert_eq!(
            unified.into_iter().collect::<Vec<_>>(),
            vec![Namespace::system(), Namespace::personal("alice")]
        );

        let user = resolve_namespaces(ScopeMode::UserOnly, "alice", None).unwrap();
        assert_eq!(user.len(), 1);
        assert!(user.contains(&Namespace::personal("alice")));

        let system = resolve_namespaces(ScopeMode::SystemOnly, "alice", None).unwrap();
        assert_eq!(system.len(), 1);
        assert!(system.contains(&Namespace::system()));

        let kb = resolve_namespaces(ScopeMode::SpecificKb, "alice", Some("hr")).unwrap();
        assert_eq!(kb.len(), 1);
        assert!(kb.contains(&Namespace::knowledge_base("hr")));
    }

    #[test]
    fn test_specific_kb_without_id_is_invalid_scope() {
        for kb in [None, Some("")] {
            let err = resolve_namespaces(ScopeMode::SpecificKb, "alice", kb).unwrap_err();
            assert!(matches!(err, RetrievalError::InvalidScope { .. }));
        }
    }

    #[test]
    fn test_identifier_rejects_namespace_syntax() {
        let request = RetrieveRequest::new("policy", ScopeMode::UserOnly, "bob:kb:hr");
        let err = validate_request(&request).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Validation {
                field: "tenant_id",
                ..
            }
        ));
    }

    #[test]
    fn test_validation_rules() {
        let empty = RetrieveRequest::new("   ", ScopeMode::Unified, "alice");
        assert!(matches!(
            validate_request(&empty),
            Err(RetrievalError::Validation { field: "query", .. })
        ));

        let long = RetrieveRequest::new("x".repeat(MAX_QUERY_CHARS + 1), ScopeMode::Unified, "a");
        assert!(matches!(
            validate_request(&long),
            Err(RetrievalError::Validation { field: "query", .. })
        ));

        let zero = RetrieveRequest::new("policy", ScopeMode::Unified, "alice").with_top_k(0);
        assert!(matches!(
            validate_request(&zero),
            Err(RetrievalError::Validation { field: "top_k", .. })
        ));

        let ok = RetrieveRequest::new("policy", ScopeMode::Unified, "alice.smith-01");
        assert!(validate_request(&ok).is_ok());
    }
}
