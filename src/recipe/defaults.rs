//! Substitute recipe used when generation fails

use super::types::{Amount, Ingredient, Recipe};
use crate::session::Target;
use serde_json::{json, Map};

/// The fallback recipe for `target`, scaled to `servings`
pub fn default_recipe(target: Target, servings: u32) -> Recipe {
    let servings = servings.max(1);
    let total = json!({
        "calories": 300,
        "protein": 20,
        "fat": 10,
        "carbs": 25,
        "fiber": 5
    });
    let per_serving = json!({
        "calories": 300.0 / f64::from(servings),
        "protein": 20.0 / f64::from(servings),
        "fat": 10.0 / f64::from(servings),
        "carbs": 25.0 / f64::from(servings),
        "fiber": 5.0 / f64::from(servings)
    });

    Recipe {
        name: format!("기본 {target} 레시피"),
        description: format!("{target} 식단을 위한 기본 레시피"),
        cooking_time: Some(json!(20)),
        difficulty: Some("easy".to_string()),
        servings: Some(servings),
        ingredients: vec![Ingredient::new("기본 재료", Amount::Text("1".into()), "개")],
        instructions: vec!["1. 기본 조리법".to_string()],
        nutrition: Some(json!({"total": total, "perServing": per_serving})),
        target_compliance: None,
        extra: Map::new(),
    }
}
