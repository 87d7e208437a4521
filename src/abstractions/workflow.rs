//! Workflow engine abstraction
//!
//! Starting the recipe pipeline for a session goes through `WorkflowEngine`;
//! the in-process engine lives in `crate::pipeline`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Start one execution with `input`, returning its identifier
    async fn start_execution(&self, input: Value) -> Result<String>;
}

/// Engine that records inputs without running anything
#[derive(Clone, Default)]
pub struct RecordingWorkflowEngine {
    pub executions: Arc<Mutex<Vec<Value>>>,
    pub fail_with: Option<String>,
}

impl RecordingWorkflowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub async fn get_executions(&self) -> Vec<Value> {
        self.executions.lock().await.clone()
    }
}

#[async_trait]
impl WorkflowEngine for RecordingWorkflowEngine {
    async fn start_execution(&self, input: Value) -> Result<String> {
        if let Some(message) = &self.fail_with {
            return Err(anyhow!(message.clone()));
        }
        let mut executions = self.executions.lock().await;
        executions.push(input);
        Ok(format!("recorded-{}", executions.len()))
    }
}
