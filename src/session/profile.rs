//! User dietary profile
//!
//! Clients submit a questionnaire (`{"target": ..., "responses": {"100": ...}}`);
//! the pipeline works on the normalized `Profile` derived from it.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Questionnaire keys shared by every target
pub const BUDGET_KEY: &str = "100";
pub const SERVINGS_KEY: &str = "101";

const DEFAULT_BUDGET: u32 = 20_000;
const DEFAULT_SERVINGS: u32 = 2;

/// Dietary goal selecting prompts and compliance rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Keto,
    #[serde(alias = "baby")]
    BabyFood,
    Diabetes,
    Diet,
    #[serde(alias = "fridge_clearing")]
    Fridge,
    #[default]
    #[serde(other)]
    General,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keto => "keto",
            Self::BabyFood => "baby_food",
            Self::Diabetes => "diabetes",
            Self::Diet => "diet",
            Self::Fridge => "fridge",
            Self::General => "general",
        }
    }

    /// Parse leniently; anything unrecognized is `General`
    pub fn from_value(value: Option<&Value>) -> Self {
        value
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    /// Expected pipeline duration in seconds
    pub fn estimated_seconds(&self) -> u32 {
        match self {
            Self::Keto => 25,
            Self::BabyFood => 30,
            Self::Diabetes => 35,
            Self::Diet => 20,
            Self::Fridge => 40,
            Self::General => 30,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized profile handed to every stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub target: Target,
    #[serde(default = "default_budget", deserialize_with = "lenient_u32")]
    pub budget: u32,
    #[serde(default = "default_servings", deserialize_with = "lenient_u32")]
    pub servings: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub health_conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allergies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooking_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baby_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub current_foods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diabetes_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_sugar: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medications: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_budget: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_budget() -> u32 {
    DEFAULT_BUDGET
}

fn default_servings() -> u32 {
    DEFAULT_SERVINGS
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(Target::General)
    }
}

impl Profile {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            budget: DEFAULT_BUDGET,
            servings: DEFAULT_SERVINGS,
            health_conditions: Vec::new(),
            allergies: Vec::new(),
            cooking_level: None,
            baby_age: None,
            current_foods: Vec::new(),
            diabetes_type: None,
            blood_sugar: None,
            medications: Vec::new(),
            available_ingredients: Vec::new(),
            additional_budget: None,
            extra: Map::new(),
        }
    }

    /// Read a normalized profile, falling back to a general profile
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_else(|_| {
            let mut profile = Self::new(Target::from_value(value.get("target")));
            if let Some(servings) = value.get("servings").and_then(as_u32) {
                profile.servings = servings;
            }
            profile
        })
    }

    /// Build the normalized profile from a questionnaire submission
    pub fn from_questionnaire(raw: &Value) -> Self {
        let empty = Map::new();
        let responses = raw
            .get("responses")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let text = |key: &str| -> Option<String> {
            responses
                .get(key)
                .and_then(|v| match v {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
        };
        let number = |key: &str, default: u32| -> u32 {
            responses.get(key).and_then(as_u32).unwrap_or(default)
        };
        let single = |key: &str| -> Vec<String> { text(key).into_iter().collect() };
        let list = |key: &str| -> Vec<String> {
            text(key)
                .map(|s| {
                    s.split(',')
                        .map(|item| item.trim().to_string())
                        .filter(|item| !item.is_empty())
                        .collect()
                })
                .unwrap_or_default()
        };

        let target = Target::from_value(raw.get("target"));
        let mut profile = Self::new(target);
        profile.budget = number(BUDGET_KEY, DEFAULT_BUDGET);
        profile.servings = number(SERVINGS_KEY, DEFAULT_SERVINGS);

        match target {
            Target::Keto => {
                profile.health_conditions = single("1");
                profile.allergies = single("2");
                profile.cooking_level = Some(text("3").unwrap_or_else(|| "beginner".into()));
            }
            Target::BabyFood => {
                profile.baby_age = Some(number("1", 6));
                profile.allergies = single("2");
                profile.current_foods = list("4");
            }
            Target::Diabetes => {
                profile.diabetes_type = Some(text("1").unwrap_or_else(|| "type2".into()));
                profile.blood_sugar = Some(text("2").unwrap_or_else(|| "normal".into()));
                profile.medications = list("5");
            }
            Target::Fridge => {
                profile.available_ingredients = list("6");
                profile.additional_budget = Some(number("7", 10_000));
            }
            Target::Diet | Target::General => {}
        }
        profile
    }

    /// Servings used for per-serving math, never below one
    pub fn effective_servings(&self) -> u32 {
        self.servings.max(1)
    }
}

/// Fields a questionnaire submission must carry, by dotted path
pub fn missing_questionnaire_fields(raw: &Value) -> Vec<String> {
    let mut missing = Vec::new();
    if !raw.is_object() {
        missing.push("userProfile".to_string());
        return missing;
    }
    for field in ["target", "responses"] {
        if raw.get(field).is_none() {
            missing.push(field.to_string());
        }
    }
    let responses = raw.get("responses");
    for key in [BUDGET_KEY, SERVINGS_KEY] {
        if responses.and_then(|r| r.get(key)).is_none() {
            missing.push(format!("responses.{key}"));
        }
    }
    missing
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

/// Accept `2`, `2.0` or `"2"` where a count is expected
pub(crate) fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    as_u32(&value).ok_or_else(|| de::Error::custom(format!("expected a count, got {value}")))
}
