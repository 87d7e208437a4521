//! Nutrition facts: unit conversion, index lookups, model estimates and
//! target compliance

pub mod calculator;
pub mod compliance;
pub mod index;
pub mod ingest;
pub mod opensearch;
pub mod service;
pub mod types;
pub mod units;

pub use calculator::{IngredientNutrition, NutritionDensity, NutritionSource, NutritionSummary};
pub use compliance::{evaluate, Compliance, ComplianceCheck};
pub use index::{MemoryNutritionIndex, NutritionIndex, VectorHit};
pub use ingest::{ingest_file, FoodCategory, IngestReport};
pub use opensearch::OpenSearchIndex;
pub use service::{effective_compliance, lookup_totals, NutritionService, ANALYSIS_FALLBACK};
pub use types::{round1, NutritionFacts, NutritionRecord};
pub use units::{clean_ingredient_name, grams_for, parse_ingredient_text, ParsedIngredient};
