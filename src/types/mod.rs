pub mod plan;
pub mod profile;
pub mod recipe;

pub use plan::{Meal, MealPlan, MealSource, PlanSummary, Rating, SignalKind};
pub use profile::{Profile, ProfileInput, SkillLevel};
pub use recipe::{GroceryCategory, Ingredient, Recipe, RecipeOrigin, SavedRecipe, name_key};
