//! Totals, per-serving values and density ratios

use super::compliance::Compliance;
use super::types::{round1, NutritionFacts, NutritionRecord};
use serde::{Deserialize, Serialize};

/// Where a nutrition summary came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NutritionSource {
    #[default]
    Index,
    Model,
}

/// Nutrition of one ingredient line at its actual weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientNutrition {
    pub ingredient: String,
    pub grams: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
    #[serde(flatten)]
    pub facts: NutritionFacts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngredientNutrition {
    /// Scale a 100 g record to `grams`
    pub fn from_record(ingredient: &str, grams: f64, record: &NutritionRecord) -> Self {
        Self {
            ingredient: ingredient.to_string(),
            grams: round1(grams),
            matched: Some(record.ingredient_name.clone()),
            facts: record.per_100g().scale(grams / 100.0).rounded(),
            error: None,
        }
    }

    /// Placeholder for an ingredient with no nutrition data
    pub fn not_found(ingredient: &str, grams: f64) -> Self {
        Self {
            ingredient: ingredient.to_string(),
            grams: round1(grams),
            matched: None,
            facts: NutritionFacts::default(),
            error: Some("영양소 정보를 찾을 수 없습니다".to_string()),
        }
    }
}

/// Nutrient ratios; `None` when there are no calories to divide by
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionDensity {
    pub protein_per_calorie: Option<f64>,
    pub fat_per_calorie: Option<f64>,
    pub carbs_per_calorie: Option<f64>,
    #[serde(rename = "fiberPer100Cal")]
    pub fiber_per_100_cal: Option<f64>,
}

impl NutritionDensity {
    pub fn from_facts(facts: &NutritionFacts) -> Self {
        if facts.calories <= 0.0 {
            return Self::default();
        }
        let ratio = |value: f64| Some(round3(value / facts.calories));
        Self {
            protein_per_calorie: ratio(facts.protein),
            fat_per_calorie: ratio(facts.fat),
            carbs_per_calorie: ratio(facts.carbs),
            fiber_per_100_cal: Some(round1(facts.fiber / facts.calories * 100.0)),
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionSummary {
    pub total: NutritionFacts,
    pub per_serving: NutritionFacts,
    pub density: NutritionDensity,
    pub servings: u32,
    pub source: NutritionSource,
    #[serde(default)]
    pub ingredient_breakdown: Vec<IngredientNutrition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_compliance: Option<Compliance>,
}

impl NutritionSummary {
    /// Sum ingredient lines and divide by servings (at least one)
    pub fn from_ingredients(items: Vec<IngredientNutrition>, servings: u32) -> Self {
        let total = items
            .iter()
            .fold(NutritionFacts::default(), |acc, item| acc + item.facts);
        let mut summary = Self::from_totals(total, servings, NutritionSource::Index);
        summary.ingredient_breakdown = items;
        summary
    }

    pub fn from_totals(total: NutritionFacts, servings: u32, source: NutritionSource) -> Self {
        let servings = servings.max(1);
        let total = total.rounded();
        let per_serving = total.scale(1.0 / f64::from(servings)).rounded();
        Self {
            total,
            per_serving,
            density: NutritionDensity::from_facts(&total),
            servings,
            source,
            ingredient_breakdown: Vec::new(),
            target_compliance: None,
        }
    }

    /// Ingredients that had no match
    pub fn unmatched(&self) -> Vec<&str> {
        self.ingredient_breakdown
            .iter()
            .filter(|i| i.error.is_some())
            .map(|i| i.ingredient.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(calories: f64, protein: f64) -> NutritionRecord {
        NutritionRecord::new(
            "두부",
            "표준식품",
            NutritionFacts {
                calories,
                protein,
                fat: 4.0,
                carbs: 2.0,
                fiber: 1.0,
                sodium: 7.0,
            },
        )
    }

    #[test]
    fn test_scaling_from_100g_basis() {
        let item = IngredientNutrition::from_record("두부 300g", 300.0, &record(84.0, 9.3));
        assert_eq!(item.facts.calories, 252.0);
        assert_eq!(item.facts.protein, 27.9);
        assert_eq!(item.matched.as_deref(), Some("두부"));
    }

    #[test]
    fn test_totals_and_per_serving() {
        let items = vec![
            IngredientNutrition::from_record("두부", 200.0, &record(100.0, 10.0)),
            IngredientNutrition::not_found("비밀재료", 50.0),
        ];
        let summary = NutritionSummary::from_ingredients(items, 2);
        assert_eq!(summary.total.calories, 200.0);
        assert_eq!(summary.per_serving.calories, 100.0);
        assert_eq!(summary.per_serving.protein, 10.0);
        assert_eq!(summary.unmatched(), vec!["비밀재료"]);
        assert_eq!(summary.density.protein_per_calorie, Some(0.1));
    }

    #[test]
    fn test_zero_servings_and_zero_calories() {
        let summary =
            NutritionSummary::from_totals(NutritionFacts::default(), 0, NutritionSource::Model);
        assert_eq!(summary.servings, 1);
        assert_eq!(summary.density, NutritionDensity::default());

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["density"]["proteinPerCalorie"].is_null());
        assert!(json["density"]["fiberPer100Cal"].is_null());
        assert_eq!(json["source"], "model");
    }
}
