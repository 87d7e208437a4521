//! Record types persisted by the document store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::error::{StorageError, StorageResult};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted session record
///
/// Stage outputs that have no dedicated field (`priceData`, `recipeStatus`,
/// `nutritionStatus`, ...) land in `extra` and round-trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    /// Expiry as epoch seconds
    pub ttl: i64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionRecord {
    /// Build a fresh idle session expiring `ttl` after `created_at`
    pub fn new(
        session_id: impl Into<String>,
        created_at: DateTime<Utc>,
        ttl: chrono::Duration,
        max_retries: u32,
    ) -> Self {
        let expires_at = created_at + ttl;
        Self {
            session_id: session_id.into(),
            status: SessionStatus::Idle,
            phase: None,
            progress: 0,
            profile: None,
            error: None,
            created_at,
            updated_at: None,
            last_activity: Some(created_at),
            expires_at,
            ttl: expires_at.timestamp(),
            retry_count: 0,
            max_retries,
            execution_id: None,
            started_at: None,
            completed_at: None,
            final_result: None,
            extra: Map::new(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.ttl < now.timestamp()
    }

    /// Read an attribute stored outside the typed fields
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Apply a partial update, touching only the fields the update names
    pub fn apply(&self, update: &SessionUpdate) -> StorageResult<Self> {
        let mut doc = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => return Err(StorageError::serialization("session is not an object")),
        };
        for (key, value) in &update.fields {
            if key == "sessionId" {
                continue;
            }
            doc.insert(key.clone(), value.clone());
        }
        Ok(serde_json::from_value(Value::Object(doc))?)
    }
}

/// A set of attribute assignments applied to one session record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    fields: Map<String, Value>,
}

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign an attribute; later assignments to the same key win
    pub fn set(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.fields.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Kind of per-stage result record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Recipe,
    Price,
    Image,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recipe => "recipe",
            Self::Price => "price",
            Self::Image => "image",
        }
    }

    /// Record key for this result type of a session
    pub fn result_id(&self, session_id: &str) -> String {
        format!("{session_id}_{}", self.as_str())
    }
}

/// Persisted per-stage result record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub result_id: String,
    pub session_id: String,
    #[serde(rename = "type")]
    pub result_type: ResultType,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub summary: Value,
    pub created_at: DateTime<Utc>,
    /// Expiry as epoch seconds
    pub ttl: i64,
}

impl ResultRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.ttl < now.timestamp()
    }
}
