use chrono::{Duration, NaiveDate, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::cache::record_served;
use super::sqlite::{Storage, fmt_date, from_json, parse_date, parse_ts, to_json};
use crate::error::MealwiseError;
use crate::types::{Meal, MealPlan, MealSource, PlanSummary, Rating, Recipe, name_key};

/// A meal about to be written.
#[derive(Debug, Clone)]
pub struct NewMeal {
    pub day_of_week: u8,
    pub recipe: Recipe,
    pub source: MealSource,
}

impl Storage {
    /// Persist a week's plan in one transaction: any existing plan for the same
    /// week is replaced (meals and grocery list cascade) and every recipe is
    /// counted in the recipe cache.
    pub async fn replace_plan(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        meals: &[NewMeal],
    ) -> Result<MealPlan, MealwiseError> {
        let now = Utc::now();
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM meal_plans WHERE user_id = ? AND week_start = ?")
            .bind(user_id)
            .bind(fmt_date(week_start))
            .execute(&mut *tx)
            .await?;

        let plan_id = sqlx::query(
            "INSERT INTO meal_plans (user_id, week_start, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(fmt_date(week_start))
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let mut stored = Vec::with_capacity(meals.len());
        for meal in meals {
            let id = sqlx::query(
                r#"INSERT INTO meals (meal_plan_id, day_of_week, name, recipe, source)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(plan_id)
            .bind(meal.day_of_week as i64)
            .bind(&meal.recipe.name)
            .bind(to_json(&meal.recipe)?)
            .bind(meal.source.as_str())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            record_served(&mut tx, &meal.recipe, now).await?;

            stored.push(Meal {
                id,
                meal_plan_id: plan_id,
                day_of_week: meal.day_of_week,
                recipe: meal.recipe.clone(),
                source: meal.source,
                rating: None,
            });
        }

        tx.commit().await?;
        Ok(MealPlan {
            id: plan_id,
            user_id: user_id.to_string(),
            week_start,
            created_at: now,
            meals: stored,
        })
    }

    pub async fn get_plan(
        &self,
        user_id: &str,
        plan_id: i64,
    ) -> Result<Option<MealPlan>, MealwiseError> {
        let row = sqlx::query(
            "SELECT id, user_id, week_start, created_at FROM meal_plans WHERE id = ? AND user_id = ?",
        )
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate_plan(row).await?)),
            None => Ok(None),
        }
    }

    pub async fn get_plan_by_week(
        &self,
        user_id: &str,
        week_start: NaiveDate,
    ) -> Result<Option<MealPlan>, MealwiseError> {
        let row = sqlx::query(
            r#"SELECT id, user_id, week_start, created_at FROM meal_plans
               WHERE user_id = ? AND week_start = ?"#,
        )
        .bind(user_id)
        .bind(fmt_date(week_start))
        .fetch_optional(self.pool())
        .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate_plan(row).await?)),
            None => Ok(None),
        }
    }

    /// History, newest week first.
    pub async fn list_plans(&self, user_id: &str) -> Result<Vec<PlanSummary>, MealwiseError> {
        let rows = sqlx::query(
            r#"SELECT p.id, p.week_start, p.created_at, COUNT(m.id) AS meal_count
               FROM meal_plans p LEFT JOIN meals m ON m.meal_plan_id = p.id
               WHERE p.user_id = ?
               GROUP BY p.id
               ORDER BY p.week_start DESC"#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                let week_start: String = row.try_get("week_start")?;
                let created_at: String = row.try_get("created_at")?;
                Ok(PlanSummary {
                    id: row.try_get("id")?,
                    week_start: parse_date(&week_start)?,
                    created_at: parse_ts(&created_at)?,
                    meal_count: row.try_get("meal_count")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(Into::into)
    }

    pub async fn delete_plan(&self, user_id: &str, plan_id: i64) -> Result<bool, MealwiseError> {
        let res = sqlx::query("DELETE FROM meal_plans WHERE id = ? AND user_id = ?")
            .bind(plan_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// A meal, only if it belongs to one of the user's plans.
    pub async fn get_meal(&self, user_id: &str, meal_id: i64) -> Result<Option<Meal>, MealwiseError> {
        let row = sqlx::query(
            r#"SELECT m.id, m.meal_plan_id, m.day_of_week, m.recipe, m.source, m.rating
               FROM meals m JOIN meal_plans p ON p.id = m.meal_plan_id
               WHERE m.id = ? AND p.user_id = ?"#,
        )
        .bind(meal_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        row.map(row_to_meal).transpose().map_err(Into::into)
    }

    /// Swap in a new recipe; clears the rating and drops the plan's grocery list.
    pub async fn replace_meal_recipe(
        &self,
        meal: &Meal,
        recipe: &Recipe,
        source: MealSource,
    ) -> Result<Meal, MealwiseError> {
        let now = Utc::now();
        let mut tx = self.pool().begin().await?;
        sqlx::query("UPDATE meals SET name = ?, recipe = ?, source = ?, rating = NULL WHERE id = ?")
            .bind(&recipe.name)
            .bind(to_json(recipe)?)
            .bind(source.as_str())
            .bind(meal.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM grocery_lists WHERE meal_plan_id = ?")
            .bind(meal.meal_plan_id)
            .execute(&mut *tx)
            .await?;
        record_served(&mut tx, recipe, now).await?;
        tx.commit().await?;

        Ok(Meal {
            recipe: recipe.clone(),
            source,
            rating: None,
            ..meal.clone()
        })
    }

    pub async fn set_meal_rating(&self, meal_id: i64, rating: Rating) -> Result<(), MealwiseError> {
        sqlx::query("UPDATE meals SET rating = ? WHERE id = ?")
            .bind(rating.as_str())
            .bind(meal_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Name keys of meals served in the `weeks` weeks before `week_start`.
    pub async fn recent_meal_keys(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        weeks: u32,
    ) -> Result<Vec<String>, MealwiseError> {
        if weeks == 0 {
            return Ok(Vec::new());
        }
        let since = week_start - Duration::weeks(weeks as i64);
        let names: Vec<(String,)> = sqlx::query_as(
            r#"SELECT m.name FROM meals m JOIN meal_plans p ON p.id = m.meal_plan_id
               WHERE p.user_id = ? AND p.week_start >= ? AND p.week_start < ?"#,
        )
        .bind(user_id)
        .bind(fmt_date(since))
        .bind(fmt_date(week_start))
        .fetch_all(self.pool())
        .await?;
        Ok(names.into_iter().map(|(n,)| name_key(&n)).collect())
    }

    async fn hydrate_plan(&self, row: SqliteRow) -> Result<MealPlan, MealwiseError> {
        let id: i64 = row.try_get("id")?;
        let week_start: String = row.try_get("week_start")?;
        let created_at: String = row.try_get("created_at")?;

        let meal_rows = sqlx::query(
            r#"SELECT id, meal_plan_id, day_of_week, recipe, source, rating
               FROM meals WHERE meal_plan_id = ? ORDER BY day_of_week, id"#,
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;
        let meals = meal_rows
            .into_iter()
            .map(row_to_meal)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MealPlan {
            id,
            user_id: row.try_get("user_id")?,
            week_start: parse_date(&week_start)?,
            created_at: parse_ts(&created_at)?,
            meals,
        })
    }
}

fn row_to_meal(row: SqliteRow) -> Result<Meal, sqlx::Error> {
    let day: i64 = row.try_get("day_of_week")?;
    let recipe: String = row.try_get("recipe")?;
    let source: String = row.try_get("source")?;
    let rating: Option<String> = row.try_get("rating")?;
    Ok(Meal {
        id: row.try_get("id")?,
        meal_plan_id: row.try_get("meal_plan_id")?,
        day_of_week: day as u8,
        recipe: from_json(&recipe)?,
        source: MealSource::parse(&source),
        rating: rating.as_deref().and_then(Rating::parse),
    })
}
