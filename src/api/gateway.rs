//! Gateway event and response envelopes
//!
//! A handler sees the event an API gateway or orchestrator would deliver and
//! answers `{statusCode, headers, body}` with the body serialized to a string.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{error, warn};

use crate::error::ChefError;

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, OPTIONS";

/// Inbound event; fields other than the gateway's own land in `rest`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_params",
        skip_serializing_if = "Option::is_none"
    )]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(
        default,
        deserialize_with = "scalar_params",
        skip_serializing_if = "Option::is_none"
    )]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Parameter maps with numbers and booleans read as their text; other values dropped
fn scalar_params<'de, D>(deserializer: D) -> Result<Option<HashMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Map<String, Value>>::deserialize(deserializer)?;
    Ok(raw.map(|params| {
        params
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                Value::Number(n) => Some((key, n.to_string())),
                Value::Bool(b) => Some((key, b.to_string())),
                _ => None,
            })
            .collect()
    }))
}

impl GatewayEvent {
    /// Read any JSON value as an event
    ///
    /// An object that does not fit the gateway shape is kept whole as the
    /// event's own fields; non-objects become an empty event.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(fields) = value else {
            warn!("Ignoring non-object event");
            return Self::default();
        };
        match serde_json::from_value(Value::Object(fields.clone())) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    "Event does not match the gateway shape ({}), reading it as a direct invocation",
                    e
                );
                Self {
                    rest: fields,
                    ..Self::default()
                }
            }
        }
    }

    pub fn http(method: &str, path: &str) -> Self {
        Self {
            http_method: Some(method.to_string()),
            path: Some(path.to_string()),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_path_param(mut self, key: &str, value: &str) -> Self {
        self.path_parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn is_preflight(&self) -> bool {
        self.http_method
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("OPTIONS"))
    }

    /// The request body as JSON
    ///
    /// `body` may be a JSON string or an object; without one, the event's own
    /// fields are the body (orchestrator invocations).
    pub fn body_json(&self) -> Result<Value, ChefError> {
        match &self.body {
            Some(Value::String(text)) if text.trim().is_empty() => Ok(Value::Object(Map::new())),
            Some(Value::String(text)) => Ok(serde_json::from_str(text)?),
            Some(Value::Null) | None => Ok(Value::Object(self.rest.clone())),
            Some(other) => Ok(other.clone()),
        }
    }

    /// Path parameter, then query parameter, named `key`
    pub fn param(&self, key: &str) -> Option<&str> {
        self.path_parameters
            .as_ref()
            .and_then(|p| p.get(key))
            .or_else(|| self.query_string_parameters.as_ref().and_then(|q| q.get(key)))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

fn cors_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        ("Access-Control-Allow-Headers".to_string(), "Content-Type".to_string()),
        ("Access-Control-Allow-Methods".to_string(), ALLOWED_METHODS.to_string()),
    ])
}

impl GatewayResponse {
    pub fn json(status_code: u16, body: &Value) -> Self {
        Self {
            status_code,
            headers: cors_headers(),
            body: body.to_string(),
        }
    }

    pub fn ok(body: &Value) -> Self {
        Self::json(200, body)
    }

    /// Empty 200 answer to a CORS preflight
    pub fn preflight() -> Self {
        Self {
            status_code: 200,
            headers: cors_headers(),
            body: String::new(),
        }
    }

    pub fn error(err: &ChefError) -> Self {
        let status = err.status_code();
        if err.is_client_error() {
            warn!("Request rejected ({}): {}", status, err);
        } else {
            error!("Request failed ({}): {}", status, err);
        }
        let mut body = json!({
            "success": false,
            "error": err.code(),
            "message": err.user_message(),
        });
        if let Some(details) = err.details() {
            body["details"] = details.clone();
        }
        Self::json(status, &body)
    }

    /// The body parsed back into JSON; an empty body reads as null
    pub fn body_json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_as_string_object_or_event() {
        let encoded = GatewayEvent::from_value(json!({"body": "{\"sessionId\": \"s1\"}"}));
        assert_eq!(encoded.body_json().unwrap()["sessionId"], "s1");

        let object = GatewayEvent::from_value(json!({"body": {"sessionId": "s2"}}));
        assert_eq!(object.body_json().unwrap()["sessionId"], "s2");

        let direct = GatewayEvent::from_value(json!({"sessionId": "s3", "ingredients": ["양파"]}));
        assert_eq!(direct.body_json().unwrap()["ingredients"][0], "양파");
    }

    #[test]
    fn test_numeric_query_parameters_are_read_as_text() {
        let event = GatewayEvent::from_value(json!({
            "httpMethod": "GET",
            "queryStringParameters": {"sessionId": "s4", "limit": 5, "debug": true, "skip": null}
        }));
        assert_eq!(event.param("sessionId"), Some("s4"));
        assert_eq!(event.param("limit"), Some("5"));
        assert_eq!(event.param("debug"), Some("true"));
        assert_eq!(event.param("skip"), None);
    }

    #[test]
    fn test_mistyped_gateway_fields_keep_the_event() {
        let event = GatewayEvent::from_value(json!({"httpMethod": 7, "sessionId": "s5"}));
        assert_eq!(event.http_method, None);
        assert_eq!(event.body_json().unwrap()["sessionId"], "s5");

        assert_eq!(GatewayEvent::from_value(json!([1, 2])), GatewayEvent::default());
    }

    #[test]
    fn test_malformed_body_is_bad_request() {
        let event = GatewayEvent::from_value(json!({"body": "{not json"}));
        let err = event.body_json().unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_preflight_and_params() {
        let event = GatewayEvent::http("options", "/sessions").with_path_param("sessionId", "s9");
        assert!(event.is_preflight());
        assert_eq!(event.param("sessionId"), Some("s9"));
        assert_eq!(event.param("other"), None);

        let response = GatewayResponse::preflight();
        assert_eq!(response.status_code, 200);
        assert!(response.body.is_empty());
        assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
    }

    #[test]
    fn test_error_body_shape() {
        let response = GatewayResponse::error(&ChefError::MissingField("sessionId".into()));
        assert_eq!(response.status_code, 400);
        let body = response.body_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "MISSING_FIELD");
        assert_eq!(response.headers["Content-Type"], "application/json");
    }
}
