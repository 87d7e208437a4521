//! Per-serving checks against the dietary target's limits

use super::types::{round1, NutritionFacts};
use crate::recipe::calorie_ceiling;
use crate::session::Target;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    Max,
    Min,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub nutrient: String,
    pub bound: Bound,
    pub limit: f64,
    pub actual: f64,
    pub passed: bool,
}

impl ComplianceCheck {
    fn new(nutrient: &str, bound: Bound, limit: f64, actual: f64) -> Self {
        let actual = round1(actual);
        let passed = match bound {
            Bound::Max => actual <= limit,
            Bound::Min => actual >= limit,
        };
        Self {
            nutrient: nutrient.to_string(),
            bound,
            limit,
            actual,
            passed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compliance {
    pub target: Target,
    pub compliant: bool,
    pub checks: Vec<ComplianceCheck>,
}

/// Percentage of calories that come from fat, 0 without calories
pub fn fat_share(facts: &NutritionFacts) -> f64 {
    if facts.calories <= 0.0 {
        0.0
    } else {
        facts.fat * 9.0 / facts.calories * 100.0
    }
}

pub fn evaluate(target: Target, per_serving: &NutritionFacts) -> Compliance {
    let ceiling = calorie_ceiling(target).map(f64::from);
    let checks = match target {
        Target::Keto => vec![
            ComplianceCheck::new("carbs", Bound::Max, 5.0, per_serving.carbs),
            ComplianceCheck::new("fatShare", Bound::Min, 70.0, fat_share(per_serving)),
        ],
        Target::Diabetes => vec![
            ComplianceCheck::new(
                "calories",
                Bound::Max,
                ceiling.unwrap_or(500.0),
                per_serving.calories,
            ),
            ComplianceCheck::new("fiber", Bound::Min, 3.0, per_serving.fiber),
        ],
        Target::Diet => vec![ComplianceCheck::new(
            "calories",
            Bound::Max,
            ceiling.unwrap_or(400.0),
            per_serving.calories,
        )],
        Target::BabyFood => vec![ComplianceCheck::new(
            "sodium",
            Bound::Max,
            200.0,
            per_serving.sodium,
        )],
        Target::Fridge | Target::General => Vec::new(),
    };
    Compliance {
        target,
        compliant: checks.iter().all(|c| c.passed),
        checks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(calories: f64, fat: f64, carbs: f64, fiber: f64, sodium: f64) -> NutritionFacts {
        NutritionFacts {
            calories,
            protein: 0.0,
            fat,
            carbs,
            fiber,
            sodium,
        }
    }

    #[test]
    fn test_keto_requires_low_carbs_and_high_fat() {
        let ok = evaluate(Target::Keto, &facts(500.0, 45.0, 4.0, 0.0, 0.0));
        assert!(ok.compliant);

        let carb_heavy = evaluate(Target::Keto, &facts(500.0, 45.0, 20.0, 0.0, 0.0));
        assert!(!carb_heavy.compliant);
        assert!(!carb_heavy.checks[0].passed);
        assert!(carb_heavy.checks[1].passed);
    }

    #[test]
    fn test_diabetes_and_diet_ceilings() {
        assert!(evaluate(Target::Diabetes, &facts(480.0, 0.0, 0.0, 4.0, 0.0)).compliant);
        assert!(!evaluate(Target::Diabetes, &facts(480.0, 0.0, 0.0, 1.0, 0.0)).compliant);
        assert!(!evaluate(Target::Diet, &facts(401.0, 0.0, 0.0, 0.0, 0.0)).compliant);
    }

    #[test]
    fn test_unconstrained_targets_always_comply() {
        let result = evaluate(Target::General, &facts(2000.0, 100.0, 300.0, 0.0, 5000.0));
        assert!(result.compliant);
        assert!(result.checks.is_empty());
    }

    #[test]
    fn test_fat_share_without_calories() {
        assert_eq!(fat_share(&NutritionFacts::default()), 0.0);
        assert!(!evaluate(Target::Keto, &NutritionFacts::default()).compliant);
    }
}
