//! Gemini embedding backend implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use notarium_core::{defaults, EmbeddingBackend, EmbeddingTask, Error, Result, Vector};

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_URL: &str = defaults::GEMINI_BASE_URL;

/// Default embedding model.
pub const DEFAULT_EMBED_MODEL: &str = defaults::EMBED_MODEL;

/// Default embedding dimension for gemini-embedding-001.
pub const DEFAULT_DIMENSION: usize = defaults::EMBED_DIMENSION;

/// Gemini embedding backend.
///
/// Calls the `models/{model}:embedContent` endpoint over HTTPS. The client
/// owns its own timeout policy; callers treat a slow call as opaque.
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
    embed_timeout_secs: u64,
}

impl GeminiBackend {
    /// Create a new Gemini backend with default model settings.
    pub fn new(api_key: String) -> Self {
        Self::with_config(
            DEFAULT_GEMINI_URL.to_string(),
            api_key,
            DEFAULT_EMBED_MODEL.to_string(),
            DEFAULT_DIMENSION,
        )
    }

    /// Create a new Gemini backend with custom configuration.
    pub fn with_config(
        base_url: String,
        api_key: String,
        model: String,
        dimension: usize,
    ) -> Self {
        let embed_timeout = std::env::var("NOTARIUM_EMBED_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::EMBED_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(embed_timeout))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            subsystem = "inference",
            component = "gemini",
            model = %model,
            dimension,
            "Initializing Gemini backend"
        );

        Self {
            client,
            base_url,
            api_key,
            model,
            dimension,
            embed_timeout_secs: embed_timeout,
        }
    }

    /// Create from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `GOOGLE_GEMINI_API_KEY` | — (required) | API key |
    /// | `GEMINI_BASE_URL` | generativelanguage.googleapis.com | API base URL |
    /// | `GEMINI_EMBED_MODEL` | `gemini-embedding-001` | Embedding model |
    /// | `GEMINI_EMBED_DIM` | `768` | Expected vector dimension |
    /// | `NOTARIUM_EMBED_TIMEOUT_SECS` | `60` | Request timeout |
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_GEMINI_API_KEY")
            .map_err(|_| Error::Config("GOOGLE_GEMINI_API_KEY is not set".to_string()))?;
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_GEMINI_URL.to_string());
        let model = std::env::var("GEMINI_EMBED_MODEL")
            .unwrap_or_else(|_| DEFAULT_EMBED_MODEL.to_string());
        let dimension = std::env::var("GEMINI_EMBED_DIM")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DIMENSION);

        Ok(Self::with_config(base_url, api_key, model, dimension))
    }
}

// Manual impl so the API key never leaks into logs or test output.
impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("embed_timeout_secs", &self.embed_timeout_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct EmbedContentRequest {
    model: String,
    content: Content,
    #[serde(rename = "taskType")]
    task_type: String,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingBackend for GeminiBackend {
    #[instrument(skip(self, text), fields(subsystem = "inference", component = "gemini", op = "embed", model = %self.model, task = task.as_str()))]
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vector> {
        let start = Instant::now();

        let request = EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
            task_type: task.as_str().to_string(),
        };

        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.base_url, self.model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(Duration::from_secs(self.embed_timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        let result: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse response: {}", e)))?;

        let values = result.embedding.values;
        if values.is_empty() {
            return Err(Error::Embedding(
                "Gemini returned an empty embedding".to_string(),
            ));
        }
        // A mismatched length is a provider contract violation, not a
        // storage concern.
        if values.len() != self.dimension {
            return Err(Error::Embedding(format!(
                "Expected dimension {}, got {}",
                self.dimension,
                values.len()
            )));
        }

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(duration_ms = elapsed, "Embedding complete");
        if elapsed > 5000 {
            warn!(
                duration_ms = elapsed,
                prompt_len = text.len(),
                slow = true,
                "Slow embedding operation"
            );
        }
        Ok(Vector::from(values))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
