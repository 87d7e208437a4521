//! Core trait definition for the document store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::error::StorageResult;
use super::types::{ResultRecord, SessionRecord, SessionUpdate};

/// Key-value document store holding session and result records
///
/// Reads treat records past their `ttl` as absent.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace a session record
    async fn put_session(&self, session: &SessionRecord) -> StorageResult<()>;

    /// Load a session by ID
    async fn get_session(&self, session_id: &str) -> StorageResult<Option<SessionRecord>>;

    /// Assign the named attributes of an existing session, leaving the rest intact
    async fn update_session(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> StorageResult<SessionRecord>;

    /// Insert or replace a result record
    async fn put_result(&self, result: &ResultRecord) -> StorageResult<()>;

    /// Load a result record by ID
    async fn get_result(&self, result_id: &str) -> StorageResult<Option<ResultRecord>>;

    /// Assign `data.<key>` of an existing result record
    async fn set_result_data(&self, result_id: &str, key: &str, value: Value)
        -> StorageResult<()>;

    /// Remove every record whose ttl lies before `now`; returns the count removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> StorageResult<usize>;
}

/// Reject keys that cannot safely name a record
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(super::StorageError::invalid_key(key))
    }
}

/// Merge `value` into the `data` object of a result record
pub(crate) fn merge_result_data(record: &mut ResultRecord, key: &str, value: Value) {
    if !record.data.is_object() {
        record.data = Value::Object(Default::default());
    }
    if let Value::Object(map) = &mut record.data {
        map.insert(key.to_string(), value);
    }
}
