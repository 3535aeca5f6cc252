use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MealwiseError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "beginner" => SkillLevel::Beginner,
            "advanced" => SkillLevel::Advanced,
            _ => SkillLevel::Intermediate,
        }
    }
}

/// Household profile collected during onboarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub display_name: Option<String>,
    pub household_size: u32,
    pub dinners_per_week: u32,
    pub dietary_restrictions: Vec<String>,
    pub disliked_ingredients: Vec<String>,
    pub favorite_cuisines: Vec<String>,
    pub max_cook_minutes: Option<u32>,
    pub skill_level: SkillLevel,
    pub onboarding_completed: bool,
    pub updated_at: DateTime<Utc>,
}

/// Body of `PUT /api/profile`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInput {
    #[serde(default)]
    pub display_name: Option<String>,
    pub household_size: u32,
    pub dinners_per_week: u32,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub disliked_ingredients: Vec<String>,
    #[serde(default)]
    pub favorite_cuisines: Vec<String>,
    #[serde(default)]
    pub max_cook_minutes: Option<u32>,
    #[serde(default)]
    pub skill_level: SkillLevel,
}

impl ProfileInput {
    pub fn validate(&self) -> Result<(), MealwiseError> {
        if !(1..=12).contains(&self.household_size) {
            return Err(MealwiseError::Validation(
                "household_size must be between 1 and 12".to_string(),
            ));
        }
        if !(1..=7).contains(&self.dinners_per_week) {
            return Err(MealwiseError::Validation(
                "dinners_per_week must be between 1 and 7".to_string(),
            ));
        }
        if let Some(m) = self.max_cook_minutes
            && !(10..=240).contains(&m)
        {
            return Err(MealwiseError::Validation(
                "max_cook_minutes must be between 10 and 240".to_string(),
            ));
        }
        Ok(())
    }

    /// Validated profile for `user_id`, with list entries trimmed and deduped.
    pub fn into_profile(self, user_id: &str) -> Result<Profile, MealwiseError> {
        self.validate()?;
        Ok(Profile {
            user_id: user_id.to_string(),
            display_name: self
                .display_name
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            household_size: self.household_size,
            dinners_per_week: self.dinners_per_week,
            dietary_restrictions: clean_list(self.dietary_restrictions),
            disliked_ingredients: clean_list(self.disliked_ingredients),
            favorite_cuisines: clean_list(self.favorite_cuisines),
            max_cook_minutes: self.max_cook_minutes,
            skill_level: self.skill_level,
            onboarding_completed: true,
            updated_at: Utc::now(),
        })
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim().to_lowercase();
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
