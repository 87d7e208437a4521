//! Outbound JSON HTTP abstraction
//!
//! The shopping search API and the search index are both plain JSON-over-HTTP
//! services; they share one `HttpFetcher` seam.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// HTTP method subset used by the fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Get,
    Post,
    Put,
}

/// A single outbound JSON request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub method: FetchMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: FetchMethod::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: FetchMethod::Post,
            body: Some(body),
            ..Self::get(url)
        }
    }

    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: FetchMethod::Put,
            body: Some(body),
            ..Self::get(url)
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: impl ToString) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Value of a query parameter, if present
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Trait for JSON HTTP calls to third-party services
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Send the request and decode a 2xx JSON body; other statuses are errors
    async fn send(&self, request: FetchRequest) -> Result<Value>;
}

/// Production implementation backed by reqwest
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn send(&self, request: FetchRequest) -> Result<Value> {
        let method = match request.method {
            FetchMethod::Get => Method::GET,
            FetchMethod::Post => Method::POST,
            FetchMethod::Put => Method::PUT,
        };
        let mut builder = self
            .client
            .request(method, &request.url)
            .query(&request.query);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Request to {} failed", request.url))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("{} returned {}: {}", request.url, status, text));
        }
        response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from {}", request.url))
    }
}

type Responder = dyn Fn(&FetchRequest) -> Result<Value> + Send + Sync;

/// Mock implementation of `HttpFetcher` for testing
///
/// Replies are produced by a closure so tests can vary them per query.
#[derive(Clone)]
pub struct MockHttpFetcher {
    responder: Arc<Responder>,
    /// Every request received
    pub requests: Arc<Mutex<Vec<FetchRequest>>>,
}

impl MockHttpFetcher {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&FetchRequest) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reply with the same body to every request
    pub fn returning(body: Value) -> Self {
        Self::new(move |_| Ok(body.clone()))
    }

    /// Fail every request
    pub fn failing(message: &'static str) -> Self {
        Self::new(move |_| Err(anyhow!(message)))
    }

    pub async fn get_requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl HttpFetcher for MockHttpFetcher {
    async fn send(&self, request: FetchRequest) -> Result<Value> {
        let reply = (self.responder)(&request);
        self.requests.lock().await.push(request);
        reply
    }
}
