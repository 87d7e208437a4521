use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::{Add, AddAssign};

/// Round half away from zero to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Macro and micro nutrients; kcal, grams, and milligrams for sodium
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionFacts {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
    pub sodium: f64,
}

impl NutritionFacts {
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            protein: self.protein * factor,
            fat: self.fat * factor,
            carbs: self.carbs * factor,
            fiber: self.fiber * factor,
            sodium: self.sodium * factor,
        }
    }

    pub fn rounded(&self) -> Self {
        Self {
            calories: round1(self.calories),
            protein: round1(self.protein),
            fat: round1(self.fat),
            carbs: round1(self.carbs),
            fiber: round1(self.fiber),
            sodium: round1(self.sodium),
        }
    }

    /// Read whatever numeric fields a loosely shaped object carries
    pub fn from_value(value: &Value) -> Self {
        let number = |key: &str| -> f64 {
            match value.get(key) {
                Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
                Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
                _ => 0.0,
            }
        };
        Self {
            calories: number("calories"),
            protein: number("protein"),
            fat: number("fat"),
            carbs: number("carbs"),
            fiber: number("fiber"),
            sodium: number("sodium"),
        }
    }
}

impl Add for NutritionFacts {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            fat: self.fat + other.fat,
            carbs: self.carbs + other.carbs,
            fiber: self.fiber + other.fiber,
            sodium: self.sodium + other.sodium,
        }
    }
}

impl AddAssign for NutritionFacts {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// One indexed food, nutrients per 100 g
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub ingredient_name: String,
    pub ingredient_name_keyword: String,
    #[serde(default)]
    pub calories_per_100g: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub sodium: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl NutritionRecord {
    pub fn new(name: &str, category: &str, per_100g: NutritionFacts) -> Self {
        Self {
            ingredient_name: name.to_string(),
            ingredient_name_keyword: name.trim().to_string(),
            calories_per_100g: per_100g.calories,
            protein: per_100g.protein,
            fat: per_100g.fat,
            carbs: per_100g.carbs,
            fiber: per_100g.fiber,
            sodium: per_100g.sodium,
            category: category.to_string(),
            embedding: None,
        }
    }

    pub fn per_100g(&self) -> NutritionFacts {
        NutritionFacts {
            calories: self.calories_per_100g,
            protein: self.protein,
            fat: self.fat,
            carbs: self.carbs,
            fiber: self.fiber,
            sodium: self.sodium,
        }
    }

    /// Document id: keyword and category
    pub fn document_id(&self) -> String {
        format!("{}_{}", self.ingredient_name_keyword, self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round1() {
        assert_eq!(round1(1.25), 1.3);
        assert_eq!(round1(0.04), 0.0);
        assert_eq!(round1(123.456), 123.5);
    }

    #[test]
    fn test_facts_from_loose_value() {
        let facts = NutritionFacts::from_value(&json!({
            "calories": "120.5", "protein": 8, "fat": null, "carbs": "n/a"
        }));
        assert_eq!(facts.calories, 120.5);
        assert_eq!(facts.protein, 8.0);
        assert_eq!(facts.fat, 0.0);
        assert_eq!(facts.carbs, 0.0);
    }

    #[test]
    fn test_record_document_shape() {
        let record = NutritionRecord::new(
            " 양파 ",
            "표준식품",
            NutritionFacts {
                calories: 40.0,
                ..Default::default()
            },
        );
        assert_eq!(record.document_id(), "양파_표준식품");
        let doc = serde_json::to_value(&record).unwrap();
        assert_eq!(doc["calories_per_100g"], 40.0);
        assert!(doc.get("embedding").is_none());
    }
}
