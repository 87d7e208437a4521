use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Ingredient quantity as produced by the model: `2`, `"2"`, `"1/2"`, `"적당량"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Default for Amount {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "IngredientInput")]
pub struct Ingredient {
    pub name: String,
    pub amount: Amount,
    pub unit: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Ingredient {
    pub fn new(name: &str, amount: Amount, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            amount,
            unit: unit.to_string(),
            extra: Map::new(),
        }
    }

    /// Free-text form such as `"2큰술"`
    pub fn quantity_text(&self) -> String {
        format!("{}{}", self.amount, self.unit)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IngredientInput {
    Text(String),
    Structured {
        #[serde(alias = "ingredient", default)]
        name: String,
        #[serde(default, alias = "quantity")]
        amount: Amount,
        #[serde(default)]
        unit: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl From<IngredientInput> for Ingredient {
    fn from(input: IngredientInput) -> Self {
        match input {
            IngredientInput::Text(name) => Self::new(name.trim(), Amount::default(), ""),
            IngredientInput::Structured {
                name,
                amount,
                unit,
                extra,
            } => Self {
                name,
                amount,
                unit,
                extra,
            },
        }
    }
}

/// A generated recipe
///
/// Unknown keys from the model reply (`ketoNotes`, `safetyNotes`, ...) are
/// kept in `extra` and serialized back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(rename = "recipeName", alias = "name", default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "cooking_time", skip_serializing_if = "Option::is_none")]
    pub cooking_time: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_servings",
        skip_serializing_if = "Option::is_none"
    )]
    pub servings: Option<u32>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default, deserialize_with = "lenient_steps")]
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_compliance: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Recipe {
    pub fn ingredient_names(&self) -> Vec<String> {
        self.ingredients
            .iter()
            .map(|i| i.name.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }

    /// A reply with neither a name nor ingredients is not a recipe
    pub fn is_usable(&self) -> bool {
        !self.name.trim().is_empty() || !self.ingredients.is_empty()
    }
}

fn lenient_servings<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u32),
        Value::String(s) => s
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .ok(),
        _ => None,
    }))
}

/// Steps arrive as strings or as `{"step": 1, "description": "..."}` objects
fn lenient_steps<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let steps = match value {
        Some(Value::Array(items)) => items,
        Some(Value::String(s)) => return Ok(vec![s]),
        _ => return Ok(Vec::new()),
    };
    Ok(steps
        .into_iter()
        .filter_map(|step| match step {
            Value::String(s) => Some(s),
            Value::Object(map) => ["description", "instruction", "text"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))
                .map(str::to_string),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect())
}
