//! In-memory document store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::storage::{
    error::{StorageError, StorageResult},
    traits::{merge_result_data, DocumentStore},
    types::{ResultRecord, SessionRecord, SessionUpdate},
};

/// In-memory document store, used by the local server and tests
#[derive(Clone, Default)]
pub struct MemoryStore {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
    results: Arc<RwLock<HashMap<String, ResultRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session records held, including expired ones
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn put_session(&self, session: &SessionRecord) -> StorageResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> StorageResult<Option<SessionRecord>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .filter(|s| !s.is_expired(Utc::now()))
            .cloned())
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> StorageResult<SessionRecord> {
        let mut sessions = self.sessions.write().await;
        let current = sessions
            .get(session_id)
            .filter(|s| !s.is_expired(Utc::now()))
            .ok_or_else(|| StorageError::not_found(format!("session {session_id}")))?;
        let updated = current.apply(update)?;
        sessions.insert(session_id.to_string(), updated.clone());
        Ok(updated)
    }

    async fn put_result(&self, result: &ResultRecord) -> StorageResult<()> {
        self.results
            .write()
            .await
            .insert(result.result_id.clone(), result.clone());
        Ok(())
    }

    async fn get_result(&self, result_id: &str) -> StorageResult<Option<ResultRecord>> {
        let results = self.results.read().await;
        Ok(results
            .get(result_id)
            .filter(|r| !r.is_expired(Utc::now()))
            .cloned())
    }

    async fn set_result_data(
        &self,
        result_id: &str,
        key: &str,
        value: Value,
    ) -> StorageResult<()> {
        let mut results = self.results.write().await;
        let record = results
            .get_mut(result_id)
            .ok_or_else(|| StorageError::not_found(format!("result {result_id}")))?;
        merge_result_data(record, key, value);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let mut sessions = self.sessions.write().await;
        let mut results = self.results.write().await;
        let before = sessions.len() + results.len();
        sessions.retain(|_, s| !s.is_expired(now));
        results.retain(|_, r| !r.is_expired(now));
        let removed = before - sessions.len() - results.len();
        debug!("Purged {} expired records from memory store", removed);
        Ok(removed)
    }
}
