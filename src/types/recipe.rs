use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store sections, in the order a grocery list presents them.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GroceryCategory {
    Produce,
    MeatSeafood,
    DairyEggs,
    Bakery,
    GrainsPasta,
    CannedJarred,
    SpicesSeasonings,
    Pantry,
    Frozen,
    #[default]
    #[serde(other)]
    Other,
}

impl GroceryCategory {
    pub const ALL: [GroceryCategory; 10] = [
        GroceryCategory::Produce,
        GroceryCategory::MeatSeafood,
        GroceryCategory::DairyEggs,
        GroceryCategory::Bakery,
        GroceryCategory::GrainsPasta,
        GroceryCategory::CannedJarred,
        GroceryCategory::SpicesSeasonings,
        GroceryCategory::Pantry,
        GroceryCategory::Frozen,
        GroceryCategory::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GroceryCategory::Produce => "Produce",
            GroceryCategory::MeatSeafood => "Meat & Seafood",
            GroceryCategory::DairyEggs => "Dairy & Eggs",
            GroceryCategory::Bakery => "Bakery",
            GroceryCategory::GrainsPasta => "Grains & Pasta",
            GroceryCategory::CannedJarred => "Canned & Jarred",
            GroceryCategory::SpicesSeasonings => "Spices & Seasonings",
            GroceryCategory::Pantry => "Pantry",
            GroceryCategory::Frozen => "Frozen",
            GroceryCategory::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: GroceryCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub prep_minutes: Option<u32>,
    #[serde(default)]
    pub cook_minutes: Option<u32>,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub dietary_tags: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl Recipe {
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    pub fn total_minutes(&self) -> Option<u32> {
        match (self.prep_minutes, self.cook_minutes) {
            (None, None) => None,
            (p, c) => Some(p.unwrap_or(0) + c.unwrap_or(0)),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.dietary_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Case-insensitive substring match against ingredient names.
    pub fn mentions_ingredient(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        !needle.is_empty()
            && self
                .ingredients
                .iter()
                .any(|i| i.name.to_lowercase().contains(&needle))
    }
}

/// Dedup key for recipe names: lowercased, whitespace collapsed.
pub fn name_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeOrigin {
    Meal,
    Pinterest,
    Manual,
}

impl RecipeOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            RecipeOrigin::Meal => "meal",
            RecipeOrigin::Pinterest => "pinterest",
            RecipeOrigin::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "meal" => RecipeOrigin::Meal,
            "pinterest" => RecipeOrigin::Pinterest,
            _ => RecipeOrigin::Manual,
        }
    }
}

/// A cookbook entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecipe {
    pub id: i64,
    pub user_id: String,
    pub recipe: Recipe,
    pub origin: RecipeOrigin,
    pub source_url: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_key_collapses_case_and_whitespace() {
        assert_eq!(name_key("  Chicken   Tikka MASALA "), "chicken tikka masala");
        assert_eq!(name_key("Chicken Tikka Masala"), name_key("chicken  tikka masala"));
    }

    #[test]
    fn total_minutes_handles_partial_times() {
        let mut r = Recipe {
            name: "x".into(),
            ..Default::default()
        };
        assert_eq!(r.total_minutes(), None);
        r.cook_minutes = Some(20);
        assert_eq!(r.total_minutes(), Some(20));
        r.prep_minutes = Some(10);
        assert_eq!(r.total_minutes(), Some(30));
    }

    #[test]
    fn unknown_category_falls_back_to_other() {
        let ing: Ingredient =
            serde_json::from_str(r#"{"name":"widget","category":"gadgets"}"#).unwrap();
        assert_eq!(ing.category, GroceryCategory::Other);
        assert_eq!(ing.quantity, None);
    }
}
