//! Client for the sentence-embeddings service.
//!
//! Thread texts and queries are turned into dense vectors by an external
//! model server: `POST /embed` takes a batch of inputs and answers with one
//! vector per input. The client slices work into service-sized batches and
//! checks every reply for the right vector count and dimensionality before
//! accepting it. Models trained with asymmetric retrieval prompts get their
//! document/query prefixes applied here, keyed by [`EncodeKind`].

use reqwest::StatusCode;
use serde_json::{Value, json};
use thiserror::Error;

use super::config::EmbeddingConfig;

/// What a text is being encoded as, which decides the prefix it carries.
#[derive(Debug, Clone, Copy)]
pub enum EncodeKind {
    Document,
    Query,
}

/// Errors that can occur while talking to the embeddings service.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embeddings service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("embeddings service rejected the request ({status}): {detail}")]
    Rejected { status: StatusCode, detail: String },
    #[error("unrecognized embeddings response shape")]
    UnrecognizedResponse,
    #[error("embeddings service returned {got} vectors for {sent} inputs")]
    ShapeMismatch { sent: usize, got: usize },
    #[error("embedding has {got} dimensions, the configured model expects {want}")]
    WrongDimension { want: usize, got: usize },
}

#[derive(Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    embed_endpoint: String,
    health_endpoint: String,
    config: EmbeddingConfig,
}

impl EmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let base = config.base_url.trim_end_matches('/');
        let embed_endpoint = format!("{base}/embed");
        let health_endpoint = format!("{base}/health");

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            embed_endpoint,
            health_endpoint,
            config,
        })
    }

    pub async fn healthcheck(&self) -> Result<(), EmbeddingError> {
        self.http
            .get(&self.health_endpoint)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Encode texts for the given purpose, one vector per input.
    pub async fn encode(
        &self,
        kind: EncodeKind,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let prefix = match kind {
            EncodeKind::Document => self.config.document_prefix.as_str(),
            EncodeKind::Query => self.config.query_prefix.as_str(),
        };

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            let reply = self.post_batch(prefix, batch).await?;
            self.accept_batch(batch.len(), reply, &mut vectors)?;
        }
        Ok(vectors)
    }

    /// Encode a single text.
    pub async fn encode_one(
        &self,
        kind: EncodeKind,
        text: &str,
    ) -> Result<Vec<f32>, EmbeddingError> {
        let texts = [text.to_string()];
        let mut vectors = self.encode(kind, &texts).await?;
        vectors
            .pop()
            .ok_or(EmbeddingError::ShapeMismatch { sent: 1, got: 0 })
    }

    async fn post_batch(&self, prefix: &str, batch: &[String]) -> Result<Value, EmbeddingError> {
        let inputs: Vec<String> = batch.iter().map(|text| format!("{prefix}{text}")).collect();

        let response = self
            .http
            .post(&self.embed_endpoint)
            .json(&json!({
                "inputs": inputs,
                "truncate": true,
                "normalize": true,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Rejected { status, detail });
        }

        Ok(response.json().await?)
    }

    /// Pull the vectors out of one reply, checking count and dimensionality
    /// against what was sent and what the configured model produces.
    fn accept_batch(
        &self,
        sent: usize,
        reply: Value,
        out: &mut Vec<Vec<f32>>,
    ) -> Result<(), EmbeddingError> {
        let vectors = vectors_from(reply)?;

        if vectors.len() != sent {
            return Err(EmbeddingError::ShapeMismatch {
                sent,
                got: vectors.len(),
            });
        }

        for vector in vectors {
            if vector.len() != self.config.dimension {
                return Err(EmbeddingError::WrongDimension {
                    want: self.config.dimension,
                    got: vector.len(),
                });
            }
            out.push(vector);
        }

        Ok(())
    }
}

/// Servers either return the vector array directly or nest it under an
/// `embeddings` key; anything else is rejected.
fn vectors_from(reply: Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let payload = match reply {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map
            .remove("embeddings")
            .ok_or(EmbeddingError::UnrecognizedResponse)?,
        _ => return Err(EmbeddingError::UnrecognizedResponse),
    };

    serde_json::from_value(payload).map_err(|_| EmbeddingError::UnrecognizedResponse)
}
