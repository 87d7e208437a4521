//! Abstraction layers for external services
//!
//! This module provides trait-based abstractions for the hosted model, the
//! third-party HTTP APIs, the secret store and the workflow engine, so every
//! stage handler can be exercised against in-process fakes.

pub mod fetcher;
pub mod model;
pub mod secrets;
pub mod workflow;

pub use fetcher::{FetchMethod, FetchRequest, HttpFetcher, MockHttpFetcher, ReqwestFetcher};
pub use model::{GenerationRequest, HttpModelClient, MockModelClient, ModelClient};
pub use secrets::{EnvSecretStore, SecretStore, StaticSecretStore};
pub use workflow::{RecordingWorkflowEngine, WorkflowEngine};
