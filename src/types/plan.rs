use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::recipe::Recipe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSource {
    Cache,
    Generated,
}

impl MealSource {
    pub fn as_str(self) -> &'static str {
        match self {
            MealSource::Cache => "cache",
            MealSource::Generated => "generated",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s == "cache" {
            MealSource::Cache
        } else {
            MealSource::Generated
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Liked,
    Disliked,
}

impl Rating {
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Liked => "liked",
            Rating::Disliked => "disliked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "liked" => Some(Rating::Liked),
            "disliked" => Some(Rating::Disliked),
            _ => None,
        }
    }
}

impl From<Rating> for SignalKind {
    fn from(r: Rating) -> Self {
        match r {
            Rating::Liked => SignalKind::Liked,
            Rating::Disliked => SignalKind::Disliked,
        }
    }
}

/// User feedback that steers later plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Liked,
    Disliked,
    Saved,
    Skipped,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Liked => "liked",
            SignalKind::Disliked => "disliked",
            SignalKind::Saved => "saved",
            SignalKind::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    pub meal_plan_id: i64,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u8,
    pub recipe: Recipe,
    pub source: MealSource,
    pub rating: Option<Rating>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: i64,
    pub user_id: String,
    pub week_start: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub meals: Vec<Meal>,
}

/// History row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub id: i64,
    pub week_start: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub meal_count: i64,
}
