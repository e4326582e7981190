//! Default HTTP-backed implementations of the [`Embedder`] and
//! [`LLMAnchorProvider`] collaborator traits, for deployments that run the
//! base embedding model and the anchor-phrase LLM behind a sidecar HTTP
//! service rather than in-process. Neither is required: both collaborator
//! traits can be implemented directly against an in-process model instead.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Deserialize;
use uuid::Uuid;

use crate::anchor_builder::{AnchorPhrases, LLMAnchorProvider};
use crate::encoder::Embedder;
use crate::error::EngineError;
use crate::projection::BASE_EMBEDDING_WIDTH;

const CONNECT_TIMEOUT_MS: u64 = 500;
const REQUEST_TIMEOUT_MS: u64 = 1_500;

fn build_client() -> Result<Client, EngineError> {
    Client::builder()
        .connect_timeout(Duration::from_millis(CONNECT_TIMEOUT_MS))
        .timeout(Duration::from_millis(REQUEST_TIMEOUT_MS))
        .build()
        .map_err(|e| EngineError::InternalInconsistency(format!("building HTTP client: {e}")))
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    vector: Vec<f32>,
}

/// Calls a sidecar's `POST /embed` with `{"text": "..."}`, expecting back
/// `{"vector": [f32; 384]}`. Every request carries a fresh correlation id
/// so the sidecar's own logs can be joined back to a specific call.
pub struct HttpEmbedder {
    base_url: String,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(base_url: impl Into<String>) -> Result<Self, EngineError> {
        Ok(HttpEmbedder {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client()?,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<[f32; BASE_EMBEDDING_WIDTH], EngineError> {
        let url = format!("{}/embed", self.base_url);
        let correlation_id = Uuid::new_v4();

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header("X-Request-Id", correlation_id.to_string())
            .body(serde_json::json!({ "text": text }).to_string())
            .send()
            .await
            .map_err(|e| EngineError::EmbedderFailure(format!("calling /embed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "<unavailable>".to_string());
            return Err(EngineError::EmbedderFailure(format!(
                "/embed returned {status} (fail-closed): {body}"
            )));
        }

        let payload: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EngineError::EmbedderFailure(format!("parsing /embed response: {e}")))?;

        if payload.vector.len() != BASE_EMBEDDING_WIDTH {
            return Err(EngineError::EmbedderFailure(format!(
                "/embed returned {}-dim vector, expected {BASE_EMBEDDING_WIDTH}",
                payload.vector.len()
            )));
        }

        let mut out = [0.0f32; BASE_EMBEDDING_WIDTH];
        out.copy_from_slice(&payload.vector);
        Ok(out)
    }
}

#[derive(Debug, Deserialize)]
struct AnchorPhrasesResponse {
    action: Vec<String>,
    resource: Vec<String>,
    data: Vec<String>,
    risk: Vec<String>,
}

/// Calls a sidecar's `POST /anchors/generate` with the rule's family id and
/// management plane payload, expecting back one exemplar-phrase list per
/// slot.
pub struct HttpAnchorProvider {
    base_url: String,
    client: Client,
}

impl HttpAnchorProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, EngineError> {
        Ok(HttpAnchorProvider {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client()?,
        })
    }
}

#[async_trait]
impl LLMAnchorProvider for HttpAnchorProvider {
    async fn generate_anchor_phrases(
        &self,
        family_id: &str,
        rule_payload: &serde_json::Value,
    ) -> Result<AnchorPhrases, EngineError> {
        let url = format!("{}/anchors/generate", self.base_url);
        let correlation_id = Uuid::new_v4();

        let body = serde_json::json!({
            "family_id": family_id,
            "rule": rule_payload,
        });

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header("X-Request-Id", correlation_id.to_string())
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| {
                EngineError::AnchorGenerationFailure {
                    rule_id: family_id.to_string(),
                    reason: format!("calling /anchors/generate: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "<unavailable>".to_string());
            return Err(EngineError::AnchorGenerationFailure {
                rule_id: family_id.to_string(),
                reason: format!("/anchors/generate returned {status} (fail-closed): {body}"),
            });
        }

        let payload: AnchorPhrasesResponse = response.json().await.map_err(|e| {
            EngineError::AnchorGenerationFailure {
                rule_id: family_id.to_string(),
                reason: format!("parsing /anchors/generate response: {e}"),
            }
        })?;

        Ok(AnchorPhrases {
            action: payload.action,
            resource: payload.resource,
            data: payload.data,
            risk: payload.risk,
        })
    }
}
