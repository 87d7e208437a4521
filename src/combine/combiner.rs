//! Merging stage outputs into the final session result
//!
//! `combine` is pure: the same input and `generated_at` always serialize to
//! the same bytes, and no shape of input makes it fail.

use super::payload::{unwrap_nutrition, unwrap_pricing, unwrap_recipe, StagePayload};
use crate::nutrition::{NutritionDensity, NutritionFacts};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub const RESULT_VERSION: &str = "2.0";
const DEFAULT_DIFFICULTY: &str = "medium";
const DEFAULT_SERVINGS: u64 = 2;

/// Raw inputs of the combine stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombineInput {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub recipe_result: Option<Value>,
    #[serde(default)]
    pub pricing_result: Option<Value>,
    #[serde(default)]
    pub nutrition_result: Option<Value>,
    #[serde(default)]
    pub profile: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeCore {
    pub name: String,
    pub description: String,
    pub ingredients: Vec<Value>,
    pub instructions: Vec<Value>,
    pub cooking_time: Value,
    pub difficulty: String,
    pub servings: Value,
    pub target_compliance: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionBlock {
    pub total: Value,
    pub per_serving: Value,
    pub by_ingredient: Vec<Value>,
    pub density: NutritionDensity,
    pub target_compliance: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub ingredient: String,
    pub product: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingInfo {
    pub items: Vec<ShoppingItem>,
    pub total_items: usize,
    pub total_cost: u64,
    pub optimal_vendors: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombineSummary {
    pub recipe_available: bool,
    pub pricing_available: bool,
    pub nutrition_available: bool,
    pub image_available: bool,
    pub profile_available: bool,
    pub ingredients_found: u64,
    pub total_ingredients: u64,
    pub success_rate: f64,
    pub target_compliance: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedData {
    pub session_id: String,
    pub recipe: RecipeCore,
    pub nutrition: NutritionBlock,
    pub pricing: Value,
    pub shopping_info: ShoppingInfo,
    pub total_estimated_cost: u64,
    pub generated_at: String,
    pub recipe_image: Option<Value>,
    pub profile: Value,
    pub summary: CombineSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedMetadata {
    pub source: String,
    pub timestamp: String,
    pub recipe_success: bool,
    pub price_success: bool,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    pub success: bool,
    pub data: CombinedData,
    pub error: Option<Value>,
    pub metadata: CombinedMetadata,
}

fn first_of<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| map.get(*k).filter(|v| !v.is_null()))
}

fn string_of(map: &Map<String, Value>, keys: &[&str]) -> String {
    match first_of(map, keys) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn array_of(map: &Map<String, Value>, key: &str) -> Vec<Value> {
    map.get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn object_or_empty(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        _ => Value::Object(Map::new()),
    }
}

fn is_empty_object(value: &Value) -> bool {
    value.as_object().map_or(true, Map::is_empty)
}

fn as_u64(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn recipe_core(recipe: &Map<String, Value>) -> RecipeCore {
    RecipeCore {
        name: string_of(recipe, &["name", "recipeName"]),
        description: string_of(recipe, &["description"]),
        ingredients: array_of(recipe, "ingredients"),
        instructions: array_of(recipe, "instructions"),
        cooking_time: first_of(recipe, &["cookingTime", "cooking_time"])
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
        difficulty: match first_of(recipe, &["difficulty"]) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => DEFAULT_DIFFICULTY.to_string(),
        },
        servings: first_of(recipe, &["servings"])
            .cloned()
            .unwrap_or_else(|| Value::from(DEFAULT_SERVINGS)),
        target_compliance: object_or_empty(recipe.get("targetCompliance")),
    }
}

/// Totals and per-serving values from the nutrition stage, else from the recipe
fn nutrition_block(nutrition: &Map<String, Value>, recipe: &Map<String, Value>) -> NutritionBlock {
    let from_recipe = recipe
        .get("nutrition")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let source = if nutrition.is_empty() { &from_recipe } else { nutrition };

    // Either `{total, perServing}` or a flat set of facts
    let total = match source.get("total") {
        Some(total @ Value::Object(_)) => total.clone(),
        _ if source.contains_key("calories") => Value::Object(source.clone()),
        _ => Value::Object(Map::new()),
    };
    let per_serving = object_or_empty(first_of(source, &["perServing", "nutritionPerServing"]));
    let by_ingredient = array_of(source, "ingredientBreakdown");

    let density = if is_empty_object(&total) {
        NutritionDensity::default()
    } else {
        NutritionDensity::from_facts(&NutritionFacts::from_value(&total))
    };

    let recipe_compliance = object_or_empty(recipe.get("targetCompliance"));
    let target_compliance = if is_empty_object(&recipe_compliance) {
        object_or_empty(source.get("targetCompliance"))
    } else {
        recipe_compliance
    };

    NutritionBlock {
        total,
        per_serving,
        by_ingredient,
        density,
        target_compliance,
    }
}

fn shopping_info(pricing: &Map<String, Value>) -> ShoppingInfo {
    let mut items = Vec::new();
    let mut total_cost: u64 = 0;
    if let Some(ingredients) = pricing.get("ingredients").and_then(Value::as_object) {
        for (ingredient, products) in ingredients {
            let Some(cheapest) = products.as_array().and_then(|p| p.first()) else {
                continue;
            };
            let price = as_u64(cheapest.get("price")).unwrap_or(0);
            total_cost = total_cost.saturating_add(price);
            items.push(ShoppingItem {
                ingredient: ingredient.clone(),
                product: cheapest.clone(),
            });
        }
    }
    let optimal_vendors = pricing
        .get("recommendations")
        .and_then(|r| r.get("optimalVendors"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    ShoppingInfo {
        total_items: items.len(),
        items,
        total_cost,
        optimal_vendors,
    }
}

/// Merge stage outputs; never fails
pub fn combine(input: &CombineInput, generated_at: DateTime<Utc>) -> CombinedResult {
    debug!(
        "Combining for {}: recipe {}, pricing {}, nutrition {}",
        input.session_id,
        StagePayload::from_value(input.recipe_result.as_ref()).kind(),
        StagePayload::from_value(input.pricing_result.as_ref()).kind(),
        StagePayload::from_value(input.nutrition_result.as_ref()).kind(),
    );

    let recipe = unwrap_recipe(input.recipe_result.as_ref());
    let pricing = unwrap_pricing(input.pricing_result.as_ref());
    let nutrition_stage = unwrap_nutrition(input.nutrition_result.as_ref());

    let core = recipe_core(&recipe);
    let nutrition = nutrition_block(&nutrition_stage, &recipe);
    let shopping = shopping_info(&pricing);

    let pricing_summary = pricing.get("summary");
    let found = as_u64(pricing_summary.and_then(|s| s.get("foundIngredients")))
        .unwrap_or(shopping.total_items as u64);
    let total_ingredients = as_u64(pricing_summary.and_then(|s| s.get("totalIngredients")))
        .unwrap_or_else(|| {
            pricing
                .get("ingredients")
                .and_then(Value::as_object)
                .map_or(0, |m| m.len() as u64)
        });
    let success_rate = pricing_summary
        .and_then(|s| s.get("successRate"))
        .and_then(Value::as_f64)
        .unwrap_or(if total_ingredients == 0 {
            0.0
        } else {
            found as f64 / total_ingredients as f64
        });
    let total_estimated_cost = as_u64(
        pricing
            .get("recommendations")
            .and_then(|r| r.get("totalEstimatedCost")),
    )
    .unwrap_or(shopping.total_cost);

    let profile = input.profile.clone().unwrap_or(Value::Null);
    let profile_available = match &profile {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    };

    let summary = CombineSummary {
        recipe_available: !core.name.is_empty(),
        pricing_available: found > 0,
        nutrition_available: !is_empty_object(&nutrition.total),
        image_available: false,
        profile_available,
        ingredients_found: found,
        total_ingredients,
        success_rate,
        target_compliance: nutrition.target_compliance.clone(),
    };

    let timestamp = generated_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    let metadata = CombinedMetadata {
        source: "combine".to_string(),
        timestamp: timestamp.clone(),
        recipe_success: summary.recipe_available,
        price_success: summary.pricing_available,
        version: RESULT_VERSION.to_string(),
    };

    CombinedResult {
        success: true,
        data: CombinedData {
            session_id: input.session_id.clone(),
            recipe: core,
            nutrition,
            pricing: Value::Object(pricing),
            shopping_info: shopping,
            total_estimated_cost,
            generated_at: timestamp,
            recipe_image: None,
            profile,
            summary,
        },
        error: None,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn pricing() -> Value {
        json!({
            "success": true,
            "data": {
                "summary": {"totalIngredients": 2, "foundIngredients": 1, "successRate": 0.5},
                "ingredients": {
                    "양파": [{"name": "양파 1kg", "price": 2500, "vendor": "마트"}],
                    "바질": []
                },
                "recommendations": {
                    "totalEstimatedCost": 2500,
                    "optimalVendors": [{"vendor": "마트", "totalPrice": 2500, "itemCount": 1, "items": []}]
                }
            }
        })
    }

    #[test]
    fn test_combines_nested_recipe_and_pricing() {
        let input = CombineInput {
            session_id: "sess_1".into(),
            recipe_result: Some(json!({
                "recipe": "{\"recipe\": {\"recipeName\": \"양파수프\", \"cooking_time\": 30, \"ingredients\": [{\"name\": \"양파\"}], \"nutrition\": {\"calories\": 200, \"protein\": 10}}}",
                "generatedAt": "x"
            })),
            pricing_result: Some(pricing()),
            nutrition_result: None,
            profile: Some(json!({"target": "general"})),
        };
        let result = combine(&input, at());
        let data = &result.data;

        assert!(result.success);
        assert_eq!(data.recipe.name, "양파수프");
        assert_eq!(data.recipe.cooking_time, json!(30));
        assert_eq!(data.recipe.difficulty, "medium");
        assert_eq!(data.recipe.servings, json!(2));
        assert_eq!(data.nutrition.total["calories"], 200);
        assert_eq!(data.nutrition.density.protein_per_calorie, Some(0.05));
        assert_eq!(data.shopping_info.total_items, 1);
        assert_eq!(data.shopping_info.items[0].ingredient, "양파");
        assert_eq!(data.shopping_info.total_cost, 2500);
        assert_eq!(data.total_estimated_cost, 2500);
        assert!(data.summary.recipe_available);
        assert!(data.summary.pricing_available);
        assert!(data.summary.nutrition_available);
        assert!(data.summary.profile_available);
        assert_eq!(data.summary.success_rate, 0.5);
        assert_eq!(result.metadata.version, "2.0");
        assert_eq!(data.generated_at, "2026-03-01T12:00:00.000Z");
    }

    #[test]
    fn test_nutrition_stage_output_wins() {
        let input = CombineInput {
            session_id: "s".into(),
            recipe_result: Some(json!({"recipe": {"name": "샐러드", "nutrition": {"calories": 1}}})),
            pricing_result: None,
            nutrition_result: Some(json!({
                "nutrition": {
                    "total": {"calories": 400, "protein": 20},
                    "perServing": {"calories": 200},
                    "ingredientBreakdown": [{"ingredient": "상추"}],
                    "targetCompliance": {"target": "diet", "compliant": true, "checks": []}
                },
                "status": "completed"
            })),
            profile: None,
        };
        let data = combine(&input, at()).data;
        assert_eq!(data.nutrition.total["calories"], 400);
        assert_eq!(data.nutrition.per_serving["calories"], 200);
        assert_eq!(data.nutrition.by_ingredient.len(), 1);
        assert_eq!(data.nutrition.target_compliance["compliant"], true);
        assert_eq!(data.summary.target_compliance["target"], "diet");
        assert!(!data.summary.profile_available);
    }

    #[test]
    fn test_everything_missing_yields_defaults() {
        let input = CombineInput {
            session_id: "s".into(),
            ..CombineInput::default()
        };
        let result = combine(&input, at());
        let data = &result.data;
        assert!(result.success);
        assert_eq!(data.recipe.name, "");
        assert!(data.recipe.ingredients.is_empty());
        assert_eq!(data.nutrition.total, json!({}));
        assert_eq!(data.nutrition.density, NutritionDensity::default());
        assert_eq!(data.pricing, json!({}));
        assert_eq!(data.shopping_info.total_cost, 0);
        assert_eq!(data.total_estimated_cost, 0);
        assert_eq!(data.summary.success_rate, 0.0);
        assert!(!data.summary.recipe_available);
        assert!(!data.summary.pricing_available);
    }

    #[test]
    fn test_malformed_fields_do_not_panic() {
        let input = CombineInput {
            session_id: "s".into(),
            recipe_result: Some(json!({"recipe": {"name": 5, "ingredients": "양파", "servings": null}})),
            pricing_result: Some(json!({"ingredients": {"양파": "free"}, "summary": "n/a"})),
            nutrition_result: Some(json!([1, 2, 3])),
            profile: Some(json!("keto")),
        };
        let data = combine(&input, at()).data;
        assert_eq!(data.recipe.name, "5");
        assert!(data.recipe.ingredients.is_empty());
        assert_eq!(data.recipe.servings, json!(2));
        assert_eq!(data.shopping_info.total_items, 0);
        assert_eq!(data.summary.total_ingredients, 1);
        assert!(data.summary.profile_available);
    }

    #[test]
    fn test_same_input_same_bytes() {
        let input = CombineInput {
            session_id: "s".into(),
            recipe_result: Some(json!({"recipe": {"name": "a"}})),
            pricing_result: Some(pricing()),
            ..CombineInput::default()
        };
        let first = serde_json::to_string(&combine(&input, at())).unwrap();
        let second = serde_json::to_string(&combine(&input, at())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extreme_prices_saturate() {
        let input = CombineInput {
            session_id: "s".into(),
            pricing_result: Some(json!({"ingredients": {
                "a": [{"price": u64::MAX}],
                "b": [{"price": 1}]
            }})),
            ..CombineInput::default()
        };
        let result = combine(&input, at());
        assert!(result.success);
        assert_eq!(result.data.shopping_info.total_cost, u64::MAX);
        assert_eq!(result.data.total_estimated_cost, u64::MAX);
    }
}
