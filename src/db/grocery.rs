use chrono::Utc;
use sqlx::Row;

use super::sqlite::{Storage, from_json, to_json};
use crate::error::MealwiseError;
use crate::grocery::{GroceryList, GroupBy};

/// Persisted grocery list snapshot with checked-off keys.
#[derive(Debug, Clone)]
pub struct StoredGroceryList {
    pub group_by: GroupBy,
    pub list: GroceryList,
    pub checked: Vec<String>,
}

impl Storage {
    pub async fn get_grocery_list(
        &self,
        plan_id: i64,
    ) -> Result<Option<StoredGroceryList>, MealwiseError> {
        let row = sqlx::query("SELECT group_by, list, checked FROM grocery_lists WHERE meal_plan_id = ?")
            .bind(plan_id)
            .fetch_optional(self.pool())
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let group_by: String = row.try_get("group_by")?;
        let list: String = row.try_get("list")?;
        let checked: String = row.try_get("checked")?;
        Ok(Some(StoredGroceryList {
            group_by: if group_by == "meal" {
                GroupBy::Meal
            } else {
                GroupBy::Category
            },
            list: from_json(&list)?,
            checked: from_json(&checked)?,
        }))
    }

    /// Upsert the snapshot for a plan.
    pub async fn save_grocery_list(
        &self,
        plan_id: i64,
        user_id: &str,
        list: &GroceryList,
        checked: &[String],
    ) -> Result<(), MealwiseError> {
        sqlx::query(
            r#"
            INSERT INTO grocery_lists (meal_plan_id, user_id, group_by, list, checked, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(meal_plan_id) DO UPDATE SET
                group_by=excluded.group_by,
                list=excluded.list,
                checked=excluded.checked,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(plan_id)
        .bind(user_id)
        .bind(list.group_by.as_str())
        .bind(to_json(list)?)
        .bind(to_json(&checked)?)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
