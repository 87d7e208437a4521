use crate::storage::StorageError;
use serde_json::Value;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// The unified error type for the pipeline handlers
#[derive(Error, Debug)]
pub enum ChefError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Validation error: {message}")]
    Validation {
        code: &'static str,
        message: String,
        details: Option<Value>,
    },

    #[error("Not found: {message}")]
    NotFound { code: &'static str, message: String },

    #[error("Conflict: {message}")]
    Conflict { code: &'static str, message: String },

    #[error("Credentials unavailable: {0}")]
    Credentials(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChefError {
    /// Create a validation error with the generic request code
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::INVALID_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    /// Create a validation error with a specific code and structured details
    pub fn validation_with_details(
        code: &'static str,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Create a missing-session error
    pub fn session_not_found(session_id: &str) -> Self {
        Self::NotFound {
            code: ErrorCode::SESSION_NOT_FOUND,
            message: format!("Session {session_id} not found"),
        }
    }

    /// Create a conflict error with a specific code
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    /// Machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => ErrorCode::MISSING_FIELD,
            Self::Validation { code, .. }
            | Self::NotFound { code, .. }
            | Self::Conflict { code, .. } => code,
            Self::Credentials(_) => ErrorCode::CREDENTIALS_UNAVAILABLE,
            Self::Upstream(_) => ErrorCode::UPSTREAM_FAILURE,
            Self::Storage(_) => ErrorCode::STORAGE_FAILURE,
            Self::Json(_) => ErrorCode::INVALID_REQUEST,
            Self::Config(_) => ErrorCode::CONFIG_INVALID,
            Self::Workflow(_) => ErrorCode::WORKFLOW_FAILURE,
            Self::ProcessingFailed(_) => ErrorCode::PROCESSING_FAILED,
            Self::Other(_) => ErrorCode::INTERNAL_ERROR,
        }
    }

    /// HTTP status equivalent of this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingField(_) | Self::Validation { .. } | Self::Json(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Credentials(_) | Self::Upstream(_) => 502,
            Self::Storage(_)
            | Self::Config(_)
            | Self::Workflow(_)
            | Self::ProcessingFailed(_)
            | Self::Other(_) => 500,
        }
    }

    /// Structured details attached to validation errors
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Validation { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// Message safe to show to API callers
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingField(field) => format!("{field} is required"),
            Self::Validation { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. } => message.clone(),
            Self::ProcessingFailed(stored) => stored.clone(),
            // Internal failures keep their detail in the logs only
            _ => describe_error_code(self.code()).to_string(),
        }
    }

    /// Whether the failure came from the caller rather than the service
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// Type alias for Results using ChefError
pub type Result<T> = std::result::Result<T, ChefError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_field_maps_to_bad_request() {
        let err = ChefError::MissingField("sessionId".to_string());
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.code(), ErrorCode::MISSING_FIELD);
        assert_eq!(err.user_message(), "sessionId is required");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_validation_details_are_kept() {
        let err = ChefError::validation_with_details(
            ErrorCode::INVALID_PROFILE,
            "profile incomplete",
            json!({"missingFields": ["target"]}),
        );
        assert_eq!(err.code(), ErrorCode::INVALID_PROFILE);
        assert_eq!(err.details(), Some(&json!({"missingFields": ["target"]})));
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = ChefError::Upstream("connection reset by 10.0.0.3".to_string());
        assert_eq!(err.status_code(), 502);
        assert!(!err.user_message().contains("10.0.0.3"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: ChefError = StorageError::not_found("sess_1").into();
        assert_eq!(err.code(), ErrorCode::STORAGE_FAILURE);
        assert_eq!(err.status_code(), 500);
    }
}
