//! Result combination: stage payload unwrapping and the final result shape

pub mod combiner;
pub mod payload;

pub use combiner::{
    combine, CombineInput, CombineSummary, CombinedData, CombinedMetadata, CombinedResult,
    NutritionBlock, RecipeCore, ShoppingInfo, ShoppingItem, RESULT_VERSION,
};
pub use payload::{unwrap_nutrition, unwrap_pricing, unwrap_recipe, StagePayload};
