//! The recipe cache: previously served recipes with a serve counter.

use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, Transaction};

use super::sqlite::{Storage, from_json, to_json};
use crate::error::MealwiseError;
use crate::types::Recipe;

#[derive(Debug, Clone)]
pub struct CachedRecipe {
    pub id: i64,
    pub recipe: Recipe,
    pub times_served: i64,
}

impl Storage {
    /// Most-served first.
    pub async fn cached_recipes(&self, limit: i64) -> Result<Vec<CachedRecipe>, MealwiseError> {
        let rows = sqlx::query(
            r#"SELECT id, recipe, times_served FROM recipe_cache
               ORDER BY times_served DESC, id ASC LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                let recipe: String = row.try_get("recipe")?;
                Ok(CachedRecipe {
                    id: row.try_get("id")?,
                    recipe: from_json(&recipe)?,
                    times_served: row.try_get("times_served")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(Into::into)
    }

    pub async fn cache_size(&self) -> Result<i64, MealwiseError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipe_cache")
            .fetch_one(self.pool())
            .await?;
        Ok(n)
    }
}

/// Upsert by name key and bump the serve counter.
pub(crate) async fn record_served(
    tx: &mut Transaction<'_, Sqlite>,
    recipe: &Recipe,
    now: DateTime<Utc>,
) -> Result<(), MealwiseError> {
    sqlx::query(
        r#"
        INSERT INTO recipe_cache (
            name_key, recipe, cuisine, dietary_tags, total_minutes,
            times_served, created_at, last_served_at
        ) VALUES (?, ?, ?, ?, ?, 1, ?, ?)
        ON CONFLICT(name_key) DO UPDATE SET
            times_served = recipe_cache.times_served + 1,
            last_served_at = excluded.last_served_at
        "#,
    )
    .bind(recipe.name_key())
    .bind(to_json(recipe)?)
    .bind(&recipe.cuisine)
    .bind(to_json(&recipe.dietary_tags)?)
    .bind(recipe.total_minutes().map(|m| m as i64))
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(&mut **tx)
    .await?;
    Ok(())
}
