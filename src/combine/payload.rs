//! Stage outputs as they reach the combiner
//!
//! A stage result may be a JSON-encoded string, an object, an object wrapped
//! in a function-response envelope (`{statusCode, body}`), or an object whose
//! `recipe` key holds another layer. Each of those is resolved here, once.

use serde_json::{Map, Value};

/// Maximum `recipe` layers unwrapped
pub const MAX_RECIPE_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum StagePayload {
    Missing,
    Encoded(String),
    Object(Map<String, Value>),
    Other(Value),
}

impl StagePayload {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::String(s)) => Self::Encoded(s.clone()),
            Some(Value::Object(map)) => Self::Object(map.clone()),
            Some(other) => Self::Other(other.clone()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Encoded(_) => "encoded",
            Self::Object(_) => "object",
            Self::Other(_) => "other",
        }
    }

    /// The payload as an object; anything that is not one becomes empty
    pub fn into_object(self) -> Map<String, Value> {
        match self {
            Self::Object(map) => map,
            Self::Encoded(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            Self::Missing | Self::Other(_) => Map::new(),
        }
    }
}

/// Strip a `{statusCode, body}` function-response envelope
fn open_envelope(map: Map<String, Value>) -> Map<String, Value> {
    let is_envelope = map.contains_key("body") && (map.contains_key("statusCode") || map.len() == 1);
    if !is_envelope {
        return map;
    }
    StagePayload::from_value(map.get("body")).into_object()
}

fn object_of(value: Option<&Value>) -> Map<String, Value> {
    open_envelope(StagePayload::from_value(value).into_object())
}

/// Innermost recipe object of a recipe-stage result
pub fn unwrap_recipe(value: Option<&Value>) -> Map<String, Value> {
    let mut current = object_of(value);
    for _ in 0..MAX_RECIPE_DEPTH {
        let Some(inner) = current.remove("recipe") else {
            break;
        };
        current = StagePayload::from_value(Some(&inner)).into_object();
    }
    current
}

/// The `{summary, ingredients, recommendations}` block of a price-stage result
pub fn unwrap_pricing(value: Option<&Value>) -> Map<String, Value> {
    let outer = object_of(value);
    match outer.get("data") {
        Some(Value::Object(data))
            if data.contains_key("ingredients") || data.contains_key("summary") =>
        {
            data.clone()
        }
        _ => outer,
    }
}

/// The nutrition block of a nutrition-stage result
pub fn unwrap_nutrition(value: Option<&Value>) -> Map<String, Value> {
    let outer = object_of(value);
    match outer.get("nutrition") {
        Some(Value::Object(inner)) => inner.clone(),
        _ => outer,
    }
}
