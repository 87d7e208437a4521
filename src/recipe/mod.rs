//! Recipe generation: prompts, reply parsing and fallbacks

pub mod defaults;
pub mod extract;
pub mod generator;
pub mod prompts;
pub mod types;

pub use defaults::default_recipe;
pub use extract::extract_json_object;
pub use generator::{GeneratedRecipe, RecipeGenerator, RecipeSource};
pub use prompts::{build_grounded_prompt, build_prompt, calorie_ceiling, nutrition_reference};
pub use types::{Amount, Ingredient, Recipe};
