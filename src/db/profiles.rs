use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::sqlite::{Storage, from_json, parse_ts, to_json};
use crate::error::MealwiseError;
use crate::types::{Profile, SkillLevel};

impl Storage {
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, MealwiseError> {
        let row = sqlx::query(
            r#"SELECT user_id, display_name, household_size, dinners_per_week,
               dietary_restrictions, disliked_ingredients, favorite_cuisines,
               max_cook_minutes, skill_level, onboarding_completed, updated_at
               FROM profiles WHERE user_id = ?"#,
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        row.map(row_to_profile).transpose().map_err(Into::into)
    }

    /// Upsert by user id.
    pub async fn upsert_profile(&self, profile: &Profile) -> Result<(), MealwiseError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (
                user_id, display_name, household_size, dinners_per_week,
                dietary_restrictions, disliked_ingredients, favorite_cuisines,
                max_cook_minutes, skill_level, onboarding_completed, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name=excluded.display_name,
                household_size=excluded.household_size,
                dinners_per_week=excluded.dinners_per_week,
                dietary_restrictions=excluded.dietary_restrictions,
                disliked_ingredients=excluded.disliked_ingredients,
                favorite_cuisines=excluded.favorite_cuisines,
                max_cook_minutes=excluded.max_cook_minutes,
                skill_level=excluded.skill_level,
                onboarding_completed=excluded.onboarding_completed,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.display_name)
        .bind(profile.household_size as i64)
        .bind(profile.dinners_per_week as i64)
        .bind(to_json(&profile.dietary_restrictions)?)
        .bind(to_json(&profile.disliked_ingredients)?)
        .bind(to_json(&profile.favorite_cuisines)?)
        .bind(profile.max_cook_minutes.map(|m| m as i64))
        .bind(profile.skill_level.as_str())
        .bind(profile.onboarding_completed as i64)
        .bind(profile.updated_at.to_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}

fn row_to_profile(row: SqliteRow) -> Result<Profile, sqlx::Error> {
    let household_size: i64 = row.try_get("household_size")?;
    let dinners_per_week: i64 = row.try_get("dinners_per_week")?;
    let max_cook_minutes: Option<i64> = row.try_get("max_cook_minutes")?;
    let skill_level: String = row.try_get("skill_level")?;
    let onboarding_completed: i64 = row.try_get("onboarding_completed")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Profile {
        user_id: row.try_get("user_id")?,
        display_name: row.try_get("display_name")?,
        household_size: household_size as u32,
        dinners_per_week: dinners_per_week as u32,
        dietary_restrictions: from_json(&row.try_get::<String, _>("dietary_restrictions")?)?,
        disliked_ingredients: from_json(&row.try_get::<String, _>("disliked_ingredients")?)?,
        favorite_cuisines: from_json(&row.try_get::<String, _>("favorite_cuisines")?)?,
        max_cook_minutes: max_cook_minutes.map(|m| m as u32),
        skill_level: SkillLevel::parse(&skill_level),
        onboarding_completed: onboarding_completed != 0,
        updated_at: parse_ts(&updated_at)?,
    })
}
