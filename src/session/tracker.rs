//! Session status tracking
//!
//! Status writes are observability: a failed write is logged and dropped so
//! the stage that issued it carries on.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::storage::{DocumentStore, SessionStatus, SessionUpdate};

#[derive(Clone)]
pub struct StatusTracker {
    store: Arc<dyn DocumentStore>,
    error_max_len: usize,
}

impl StatusTracker {
    pub fn new(store: Arc<dyn DocumentStore>, error_max_len: usize) -> Self {
        Self {
            store,
            error_max_len,
        }
    }

    /// Record status, phase and progress for a session
    pub async fn update(
        &self,
        session_id: &str,
        status: SessionStatus,
        phase: &str,
        progress: u8,
        error: Option<&str>,
    ) {
        self.update_with(session_id, status, phase, progress, error, SessionUpdate::new())
            .await;
    }

    /// Like `update`, also assigning the attributes in `extra`
    pub async fn update_with(
        &self,
        session_id: &str,
        status: SessionStatus,
        phase: &str,
        progress: u8,
        error: Option<&str>,
        extra: SessionUpdate,
    ) {
        let mut update = extra
            .set("status", status)
            .set("phase", phase)
            .set("progress", progress.min(100));
        if let Some(message) = error {
            update = update.set("error", truncate_error(message, self.error_max_len));
        }
        debug!(
            "Session {} -> {} / {} / {}",
            session_id, status, phase, progress
        );
        self.set_attributes(session_id, update).await;
    }

    /// Assign attributes without touching status, swallowing failures
    pub async fn set_attributes(&self, session_id: &str, update: SessionUpdate) {
        let now = Utc::now();
        let update = update.set("updatedAt", now).set("lastActivity", now);
        if let Err(e) = self.store.update_session(session_id, &update).await {
            warn!("Failed to update status for session {}: {}", session_id, e);
        }
    }
}

/// Cut `message` to at most `max_len` characters
pub fn truncate_error(message: &str, max_len: usize) -> String {
    match message.char_indices().nth(max_len) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}
