use crate::model::EmbeddingModel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vecgate_common::{ModelError, ModelResult};

pub const DEFAULT_MODEL: &str = "tazarov/all-minilm-l6-v2-f32:latest";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: 60,
        }
    }
}

impl OllamaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!("base_url '{}' is not an http(s) URL", self.base_url));
        }
        if self.model.trim().is_empty() {
            return Err("model name is required".to_string());
        }
        if self.timeout_seconds == 0 {
            return Err("timeout must be at least one second".to_string());
        }
        Ok(())
    }

    fn embeddings_url(&self) -> String {
        format!("{}/api/embeddings", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f64>,
}

/// Embeddings served by an Ollama instance over HTTP.
pub struct OllamaEmbeddings {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaEmbeddings {
    pub fn new(config: OllamaConfig) -> ModelResult<Self> {
        config.validate().map_err(ModelError::Request)?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ModelError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

#[async_trait]
impl EmbeddingModel for OllamaEmbeddings {
    fn model_name(&self) -> String {
        self.config.model.clone()
    }

    async fn embed_query(&self, text: &str) -> ModelResult<Vec<f32>> {
        debug!("Embedding {} chars with {}", text.len(), self.config.model);

        let response = self
            .client
            .post(self.config.embeddings_url())
            .json(&EmbeddingRequest {
                model: &self.config.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;

        if parsed.embedding.is_empty() {
            return Err(ModelError::EmptyEmbedding(self.config.model.clone()));
        }

        Ok(parsed.embedding.into_iter().map(|v| v as f32).collect())
    }
}
