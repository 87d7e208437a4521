//! Nutrition for recipes and ingredient lists
//!
//! Index strategy: exact keyword, then embedding neighbour above the
//! similarity floor, then fuzzy text; first hit wins. Model strategy asks the
//! model for totals and falls back to the index when the reply is unusable.

use super::calculator::{IngredientNutrition, NutritionSource, NutritionSummary};
use super::compliance::{evaluate, Compliance};
use super::index::NutritionIndex;
use super::types::{NutritionFacts, NutritionRecord};
use super::units::{clean_ingredient_name, grams_for, parse_ingredient_text};
use crate::abstractions::{GenerationRequest, ModelClient};
use crate::config::{ModelConfig, NutritionConfig, NutritionStrategy};
use crate::recipe::{extract_json_object, Recipe};
use crate::session::Profile;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Returned when the analysis model call fails
pub const ANALYSIS_FALLBACK: &str = "영양소 분석을 생성할 수 없습니다.";

const NUTRITION_MAX_TOKENS: u32 = 1000;
const ANALYSIS_TEMPERATURE: f32 = 0.1;

pub struct NutritionService {
    index: Arc<dyn NutritionIndex>,
    model: Arc<dyn ModelClient>,
    config: NutritionConfig,
    model_config: ModelConfig,
}

impl NutritionService {
    pub fn new(
        index: Arc<dyn NutritionIndex>,
        model: Arc<dyn ModelClient>,
        config: NutritionConfig,
        model_config: ModelConfig,
    ) -> Self {
        Self {
            index,
            model,
            config,
            model_config,
        }
    }

    pub fn index(&self) -> &Arc<dyn NutritionIndex> {
        &self.index
    }

    /// Find the indexed record for an ingredient name
    ///
    /// Lookup errors are logged and treated as a miss.
    pub async fn resolve(&self, name: &str) -> Option<NutritionRecord> {
        let name = clean_ingredient_name(name);
        if name.is_empty() {
            return None;
        }

        match self.index.find_exact(&name).await {
            Ok(Some(record)) => return Some(record),
            Ok(None) => {}
            Err(e) => warn!("Exact nutrition lookup for {} failed: {:#}", name, e),
        }

        match self.model.embed(&name).await {
            Ok(vector) if !vector.is_empty() => match self.index.find_nearest(&vector).await {
                Ok(Some(hit)) if hit.score >= self.config.min_similarity => {
                    debug!("{} matched {} by similarity {:.3}", name, hit.record.ingredient_name, hit.score);
                    return Some(hit.record);
                }
                Ok(_) => {}
                Err(e) => warn!("Vector nutrition lookup for {} failed: {:#}", name, e),
            },
            Ok(_) => {}
            Err(e) => debug!("No embedding for {}: {}", name, e),
        }

        match self.index.find_fuzzy(&name).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Fuzzy nutrition lookup for {} failed: {:#}", name, e);
                None
            }
        }
    }

    async fn line(&self, label: &str, lookup_name: &str, grams: f64) -> IngredientNutrition {
        match self.resolve(lookup_name).await {
            Some(record) => IngredientNutrition::from_record(label, grams, &record),
            None => IngredientNutrition::not_found(label, grams),
        }
    }

    /// Index-strategy nutrition for a recipe
    pub async fn from_index(&self, recipe: &Recipe, servings: u32) -> NutritionSummary {
        let mut items = Vec::with_capacity(recipe.ingredients.len());
        for ingredient in &recipe.ingredients {
            let (lookup_name, grams) = if ingredient.unit.is_empty() && ingredient.amount.to_string().is_empty() {
                let parsed = parse_ingredient_text(&ingredient.name);
                (parsed.name, parsed.grams)
            } else {
                (
                    ingredient.name.clone(),
                    grams_for(&ingredient.amount, &ingredient.unit),
                )
            };
            items.push(self.line(&ingredient.name, &lookup_name, grams).await);
        }
        NutritionSummary::from_ingredients(items, servings)
    }

    /// Model-strategy nutrition; `None` when the reply cannot be used
    pub async fn from_model(&self, recipe: &Recipe, profile: &Profile) -> Option<NutritionSummary> {
        let request = GenerationRequest {
            model: self.model_config.nutrition_model.clone(),
            prompt: nutrition_prompt(recipe, profile),
            max_tokens: NUTRITION_MAX_TOKENS,
            temperature: self.model_config.temperature,
        };
        let text = match self.model.generate(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Model nutrition estimate failed: {:#}", e);
                return None;
            }
        };
        let reply = extract_json_object(&text)?;
        let totals = reply.get("nutrition").filter(|v| v.is_object())?;
        let total = NutritionFacts::from_value(totals);
        if total.calories <= 0.0 {
            return None;
        }
        let mut summary = NutritionSummary::from_totals(
            total,
            profile.effective_servings(),
            NutritionSource::Model,
        );
        if let Some(per_serving) = reply.get("nutritionPerServing").filter(|v| v.is_object()) {
            let reported = NutritionFacts::from_value(per_serving).rounded();
            if reported.calories > 0.0 {
                summary.per_serving = reported;
            }
        }
        Some(summary)
    }

    /// Nutrition for a recipe with the configured strategy, plus compliance
    pub async fn calculate(&self, recipe: &Recipe, profile: &Profile) -> NutritionSummary {
        let servings = recipe
            .servings
            .filter(|s| *s > 0)
            .unwrap_or_else(|| profile.effective_servings());

        let mut summary = match self.config.strategy {
            NutritionStrategy::Model => match self.from_model(recipe, profile).await {
                Some(summary) => summary,
                None => {
                    warn!("Falling back to index nutrition for '{}'", recipe.name);
                    self.from_index(recipe, servings).await
                }
            },
            NutritionStrategy::Index => self.from_index(recipe, servings).await,
        };
        summary.target_compliance = Some(evaluate(profile.target, &summary.per_serving));
        info!(
            "Nutrition for '{}' ({:?}): {} kcal total",
            recipe.name, summary.source, summary.total.calories
        );
        summary
    }

    /// Nutrition for free-text ingredient lines
    pub async fn lookup_lines(&self, lines: &[String]) -> Vec<IngredientNutrition> {
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let parsed = parse_ingredient_text(line);
            items.push(self.line(line, &parsed.name, parsed.grams).await);
        }
        items
    }

    /// Free-form model commentary on a lookup; never fails
    pub async fn analysis(
        &self,
        items: &[IngredientNutrition],
        totals: &NutritionFacts,
        user_profile: &Value,
    ) -> String {
        let request = GenerationRequest {
            model: self.model_config.analysis_model.clone(),
            prompt: analysis_prompt(items, totals, user_profile),
            max_tokens: NUTRITION_MAX_TOKENS,
            temperature: ANALYSIS_TEMPERATURE,
        };
        match self.model.generate(&request).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => ANALYSIS_FALLBACK.to_string(),
            Err(e) => {
                warn!("Nutrition analysis failed: {:#}", e);
                ANALYSIS_FALLBACK.to_string()
            }
        }
    }
}

/// `total_nutrition` block of the lookup endpoint
pub fn lookup_totals(items: &[IngredientNutrition]) -> (NutritionFacts, Value) {
    let total = items
        .iter()
        .fold(NutritionFacts::default(), |acc, i| acc + i.facts)
        .rounded();
    let mut map = Map::new();
    for (key, value) in [
        ("total_calories", total.calories),
        ("total_protein", total.protein),
        ("total_fat", total.fat),
        ("total_carbs", total.carbs),
        ("total_fiber", total.fiber),
        ("total_sodium", total.sodium),
    ] {
        map.insert(key.to_string(), json!(value));
    }
    (total, Value::Object(map))
}

/// A recipe's own compliance annotation wins over the computed one
pub fn effective_compliance(recipe: &Recipe, computed: Option<&Compliance>) -> Option<Value> {
    recipe
        .target_compliance
        .clone()
        .filter(|v| !v.is_null())
        .or_else(|| computed.and_then(|c| serde_json::to_value(c).ok()))
}

fn nutrition_prompt(recipe: &Recipe, profile: &Profile) -> String {
    let names = recipe.ingredient_names();
    let ingredients = if names.is_empty() {
        "No ingredients available".to_string()
    } else {
        names.join(", ")
    };
    format!(
        r#"다음 레시피의 정확한 영양소를 계산해주세요:

레시피: {name}
재료: {ingredients}
인분: {servings}인분

사용자 프로필:
- 목표: {target}

다음 JSON 형식으로만 응답해주세요:
{{
  "nutrition": {{"calories": 0, "carbs": 0, "protein": 0, "fat": 0, "fiber": 0, "sodium": 0}},
  "nutritionPerServing": {{"calories": 0, "carbs": 0, "protein": 0, "fat": 0}}
}}"#,
        name = if recipe.name.is_empty() { "Unknown Recipe" } else { &recipe.name },
        servings = profile.effective_servings(),
        target = profile.target,
    )
}

fn analysis_prompt(items: &[IngredientNutrition], totals: &NutritionFacts, user_profile: &Value) -> String {
    let lines: Vec<String> = items
        .iter()
        .map(|i| {
            format!(
                "- {}: {}kcal, 단백질 {}g, 지방 {}g, 탄수화물 {}g",
                i.ingredient, i.facts.calories, i.facts.protein, i.facts.fat, i.facts.carbs
            )
        })
        .collect();
    let goal = user_profile
        .get("goal")
        .and_then(Value::as_str)
        .unwrap_or("건강한 식단");
    let restrictions = user_profile
        .get("restrictions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "없음".to_string());

    format!(
        r#"다음 레시피의 영양소 정보를 분석하여 건강상 이점과 주의사항을 설명해주세요:

레시피 재료별 영양소:
{lines}

총 영양소:
- 칼로리: {calories}kcal
- 단백질: {protein}g
- 지방: {fat}g
- 탄수화물: {carbs}g
- 식이섬유: {fiber}g
- 나트륨: {sodium}mg

사용자 프로필:
- 목표: {goal}
- 제한사항: {restrictions}

다음 형식으로 답변해주세요:
1. 영양소 균형 평가
2. 건강상 이점
3. 주의사항 (있다면)
4. 개선 제안 (있다면)

답변은 한국어로 친근하고 이해하기 쉽게 작성해주세요."#,
        lines = lines.join("\n"),
        calories = totals.calories,
        protein = totals.protein,
        fat = totals.fat,
        carbs = totals.carbs,
        fiber = totals.fiber,
        sodium = totals.sodium,
    )
}
