use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::collections::HashSet;

use super::sqlite::{Storage, from_json, parse_ts, to_json};
use crate::error::MealwiseError;
use crate::types::{Recipe, RecipeOrigin, SavedRecipe};

const SELECT_SAVED: &str = r#"SELECT id, user_id, recipe, origin, source_url, image_url, created_at
    FROM saved_recipes"#;

impl Storage {
    /// Cookbook, newest first, optionally filtered by a name substring.
    pub async fn list_saved(
        &self,
        user_id: &str,
        query: Option<&str>,
    ) -> Result<Vec<SavedRecipe>, MealwiseError> {
        let rows = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let pattern = format!("%{}%", escape_like(&q.to_lowercase()));
                sqlx::query(&format!(
                    "{SELECT_SAVED} WHERE user_id = ? AND name_key LIKE ? ESCAPE '\\' ORDER BY id DESC"
                ))
                .bind(user_id)
                .bind(pattern)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query(&format!("{SELECT_SAVED} WHERE user_id = ? ORDER BY id DESC"))
                    .bind(user_id)
                    .fetch_all(self.pool())
                    .await?
            }
        };
        rows.into_iter()
            .map(row_to_saved)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub async fn get_saved(
        &self,
        user_id: &str,
        id: i64,
    ) -> Result<Option<SavedRecipe>, MealwiseError> {
        let row = sqlx::query(&format!("{SELECT_SAVED} WHERE user_id = ? AND id = ?"))
            .bind(user_id)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(row_to_saved).transpose().map_err(Into::into)
    }

    pub async fn find_saved_by_name(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<SavedRecipe>, MealwiseError> {
        let row = sqlx::query(&format!("{SELECT_SAVED} WHERE user_id = ? AND name_key = ?"))
            .bind(user_id)
            .bind(crate::types::name_key(name))
            .fetch_optional(self.pool())
            .await?;
        row.map(row_to_saved).transpose().map_err(Into::into)
    }

    pub async fn saved_name_keys(&self, user_id: &str) -> Result<HashSet<String>, MealwiseError> {
        let keys: Vec<(String,)> =
            sqlx::query_as("SELECT name_key FROM saved_recipes WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(self.pool())
                .await?;
        Ok(keys.into_iter().map(|(k,)| k).collect())
    }

    /// Insert into the cookbook; a name already saved by this user is a
    /// [`MealwiseError::DuplicateRecipe`].
    pub async fn insert_saved(
        &self,
        user_id: &str,
        recipe: &Recipe,
        origin: RecipeOrigin,
    ) -> Result<SavedRecipe, MealwiseError> {
        let now = Utc::now();
        let res = sqlx::query(
            r#"INSERT INTO saved_recipes
               (user_id, name, name_key, recipe, origin, source_url, image_url, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(user_id)
        .bind(&recipe.name)
        .bind(recipe.name_key())
        .bind(to_json(recipe)?)
        .bind(origin.as_str())
        .bind(&recipe.source_url)
        .bind(&recipe.image_url)
        .bind(now.to_rfc3339())
        .execute(self.pool())
        .await;

        match res {
            Ok(done) => Ok(SavedRecipe {
                id: done.last_insert_rowid(),
                user_id: user_id.to_string(),
                recipe: recipe.clone(),
                origin,
                source_url: recipe.source_url.clone(),
                image_url: recipe.image_url.clone(),
                created_at: now,
            }),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(MealwiseError::DuplicateRecipe(recipe.name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_saved(&self, user_id: &str, id: i64) -> Result<bool, MealwiseError> {
        let res = sqlx::query("DELETE FROM saved_recipes WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn row_to_saved(row: SqliteRow) -> Result<SavedRecipe, sqlx::Error> {
    let recipe: String = row.try_get("recipe")?;
    let origin: String = row.try_get("origin")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(SavedRecipe {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        recipe: from_json(&recipe)?,
        origin: RecipeOrigin::parse(&origin),
        source_url: row.try_get("source_url")?,
        image_url: row.try_get("image_url")?,
        created_at: parse_ts(&created_at)?,
    })
}
