/// Error code registry for API responses
///
/// Codes are the machine-readable `error` field of every failed gateway
/// response. They are grouped by what the caller did wrong or what broke:
/// - request problems (400)
/// - lookup problems (404)
/// - state conflicts (409)
/// - upstream and internal failures (5xx)
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Request errors
    pub const MISSING_FIELD: &'static str = "MISSING_FIELD";
    pub const INVALID_PROFILE: &'static str = "INVALID_PROFILE";
    pub const INVALID_REQUEST: &'static str = "INVALID_REQUEST";
    pub const INVALID_STATUS: &'static str = "INVALID_STATUS";

    // Lookup errors
    pub const SESSION_NOT_FOUND: &'static str = "SESSION_NOT_FOUND";
    pub const RESULT_NOT_FOUND: &'static str = "RESULT_NOT_FOUND";
    pub const ROUTE_NOT_FOUND: &'static str = "ROUTE_NOT_FOUND";

    // State errors
    pub const ALREADY_PROCESSING: &'static str = "ALREADY_PROCESSING";

    // Upstream and internal errors
    pub const PROCESSING_FAILED: &'static str = "PROCESSING_FAILED";
    pub const CREDENTIALS_UNAVAILABLE: &'static str = "CREDENTIALS_UNAVAILABLE";
    pub const UPSTREAM_FAILURE: &'static str = "UPSTREAM_FAILURE";
    pub const STORAGE_FAILURE: &'static str = "STORAGE_FAILURE";
    pub const WORKFLOW_FAILURE: &'static str = "WORKFLOW_FAILURE";
    pub const CONFIG_INVALID: &'static str = "CONFIG_INVALID";
    pub const INTERNAL_ERROR: &'static str = "INTERNAL_ERROR";
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: &str) -> &'static str {
    match code {
        ErrorCode::MISSING_FIELD => "A required request field is missing",
        ErrorCode::INVALID_PROFILE => "The user profile is incomplete",
        ErrorCode::INVALID_REQUEST => "The request body could not be understood",
        ErrorCode::INVALID_STATUS => "The session is not in a state that has a result",
        ErrorCode::SESSION_NOT_FOUND => "No session exists with that identifier",
        ErrorCode::RESULT_NOT_FOUND => "The session completed but stored no result",
        ErrorCode::ROUTE_NOT_FOUND => "No handler is registered for this route",
        ErrorCode::ALREADY_PROCESSING => "The session is already being processed",
        ErrorCode::PROCESSING_FAILED => "A pipeline stage failed for this session",
        ErrorCode::CREDENTIALS_UNAVAILABLE => "Credentials for an external API are missing",
        ErrorCode::UPSTREAM_FAILURE => "An external service call failed",
        ErrorCode::STORAGE_FAILURE => "The document store rejected the operation",
        ErrorCode::WORKFLOW_FAILURE => "The workflow execution could not be started",
        ErrorCode::CONFIG_INVALID => "The service configuration is invalid",
        _ => "Internal error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_have_descriptions() {
        assert_eq!(
            describe_error_code(ErrorCode::SESSION_NOT_FOUND),
            "No session exists with that identifier"
        );
        assert_eq!(describe_error_code("SOMETHING_ELSE"), "Internal error");
    }
}
