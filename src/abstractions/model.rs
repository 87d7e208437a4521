//! Hosted model abstraction layer
//!
//! Text generation and embeddings go through `ModelClient` so stage handlers
//! can run against `MockModelClient` in tests.

use crate::config::ModelConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

/// One text-generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Trait for hosted model operations
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generate text for a single user prompt, returning the first text block
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Embed `text` into a vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingRequest<'a> {
    input_text: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Model client speaking the messages API over HTTP
pub struct HttpModelClient {
    client: Client,
    endpoint: String,
    embedding_endpoint: Option<String>,
    embedding_model: String,
    api_key: Option<String>,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl HttpModelClient {
    pub fn new(config: &ModelConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            embedding_endpoint: config.embedding_endpoint.clone(),
            embedding_model: config.embedding_model.clone(),
            api_key,
            max_retries: config.max_retries,
            retry_delay_ms: 500,
        })
    }

    async fn make_request(&self, request: &GenerationRequest) -> Result<String> {
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("anthropic-version", "2023-06-01")
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder.send().await.context("Model request failed")?;
        match response.status() {
            StatusCode::OK => {
                let parsed: MessagesResponse = response
                    .json()
                    .await
                    .context("Failed to parse model response")?;
                parsed
                    .content
                    .into_iter()
                    .next()
                    .map(|block| block.text)
                    .ok_or_else(|| anyhow!("Model response had no content"))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(anyhow!("Rate limit exceeded")),
            StatusCode::UNAUTHORIZED => Err(anyhow!("Model endpoint rejected the API key")),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(anyhow!("Model API error {status}: {text}"))
            }
        }
    }

    fn is_retryable(error: &anyhow::Error) -> bool {
        let message = error.to_string();
        message.contains("Rate limit") || message.contains("request failed")
    }
}

/// Exponential backoff for the `attempt`-th retry (1-based), saturating at `u64::MAX`
pub fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let mut retry_count = 0;
        loop {
            match self.make_request(request).await {
                Ok(text) => {
                    debug!("Model {} returned {} chars", request.model, text.len());
                    return Ok(text);
                }
                Err(e) if retry_count < self.max_retries && Self::is_retryable(&e) => {
                    retry_count += 1;
                    let delay = backoff_delay_ms(self.retry_delay_ms, retry_count);
                    warn!("Model call failed ({}), retrying in {}ms", e, delay);
                    sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let endpoint = self
            .embedding_endpoint
            .as_deref()
            .ok_or_else(|| anyhow!("No embedding endpoint configured"))?;

        let mut builder = self.client.post(endpoint).json(&EmbeddingRequest {
            input_text: text,
            model: &self.embedding_model,
        });
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder
            .send()
            .await
            .context("Embedding request failed")?
            .error_for_status()
            .context("Embedding endpoint returned an error")?;
        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;
        Ok(parsed.embedding)
    }
}

/// Mock implementation of `ModelClient` for testing
pub struct MockModelClient {
    /// Queued replies for `generate`, consumed in order
    pub responses: Arc<Mutex<Vec<Result<String>>>>,
    /// Embeddings keyed by input text
    pub embeddings: Arc<Mutex<HashMap<String, Vec<f32>>>>,
    /// Every generation request received
    pub calls: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockModelClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            embeddings: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn add_response(&self, text: &str) {
        self.responses.lock().await.push(Ok(text.to_string()));
    }

    pub async fn add_error(&self, message: &str) {
        self.responses.lock().await.push(Err(anyhow!(message.to_string())));
    }

    pub async fn add_embedding(&self, text: &str, vector: Vec<f32>) {
        self.embeddings.lock().await.insert(text.to_string(), vector);
    }

    pub async fn get_calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.calls.lock().await.push(request.clone());
        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            return Err(anyhow!("No mock response configured"));
        }
        responses.remove(0)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embeddings
            .lock()
            .await
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow!("No mock embedding for {text}"))
    }
}
