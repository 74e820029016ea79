//! Embedding client for an HTTP `/embed/batch` service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::clients::{Embedding, EmbeddingClient};
use crate::error::ClientError;

#[derive(Deserialize)]
struct EmbedBatchResponse {
    vectors: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    model: Option<String>,
}

/// HTTP embedding client. One request per query, batch of one.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingClient {
    client: Client,
    base_url: String,
    model: Option<String>,
    timeout: Duration,
}

impl HttpEmbeddingClient {
    /// Client for `base_url` with a transport-level `timeout`.
    ///
    /// # Errors
    ///
    /// [`ClientError::Unavailable`] when the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ClientError::Unavailable(format!("http client: {error}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: None,
            timeout,
        })
    }

    /// Send a model hint with every request.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = Some(model.trim().to_string()).filter(|value| !value.is_empty());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embed/batch", self.base_url)
    }
}

/// Map a non-success HTTP status to a client error.
#[must_use]
pub fn classify_status(status: StatusCode) -> ClientError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        ClientError::RateLimited
    } else {
        ClientError::Unavailable(format!("embedding service returned {status}"))
    }
}

/// Decode an `/embed/batch` body into the first vector.
///
/// # Errors
///
/// [`ClientError::Malformed`] for undecodable JSON or a missing/empty vector.
pub fn parse_embed_response(
    body: &[u8],
    fallback_model: &str,
) -> Result<Embedding, ClientError> {
    let data: EmbedBatchResponse = serde_json::from_slice(body)
        .map_err(|error| ClientError::Malformed(format!("undecodable body: {error}")))?;
    let vector = data
        .vectors
        .and_then(|vectors| vectors.into_iter().next())
        .filter(|vector| !vector.is_empty())
        .ok_or_else(|| ClientError::Malformed("response carried no vector".to_string()))?;
    Ok(Embedding {
        vector,
        model_id: data.model.unwrap_or_else(|| fallback_model.to_string()),
    })
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Embedding, ClientError> {
        let started = Instant::now();
        let mut body = serde_json::json!({ "texts": [text] });
        if let Some(model) = &self.model {
            body["model"] = serde_json::Value::String(model.clone());
        }
        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                tracing::debug!(
                    event = "retrieval.embedding.http.request_failed",
                    elapsed_ms = started.elapsed().as_millis(),
                    error = %error,
                    "embedding http request failed"
                );
                if error.is_timeout() {
                    ClientError::Timeout(self.timeout)
                } else {
                    ClientError::Unavailable(error.to_string())
                }
            })?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(
                event = "retrieval.embedding.http.non_success_status",
                status = %status,
                elapsed_ms = started.elapsed().as_millis(),
                "embedding http returned non-success status"
            );
            return Err(classify_status(status));
        }
        let bytes = response.bytes().await.map_err(|error| {
            if error.is_timeout() {
                ClientError::Timeout(self.timeout)
            } else {
                ClientError::Malformed(format!("unreadable body: {error}"))
            }
        })?;
        let embedding = parse_embed_response(&bytes, self.model.as_deref().unwrap_or("remote"))?;
        tracing::debug!(
            event = "retrieval.embedding.http.completed",
            elapsed_ms = started.elapsed().as_millis(),
            dimension = embedding.vector.len(),
            "embedding http path completed"
        );
        Ok(embedding)
    }
}
