use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::debug;

use crate::db::StoredGroceryList;
use crate::error::MealwiseError;
use crate::grocery::{GroceryList, GroupBy, MealIngredients, build_grocery_list};
use crate::middleware::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::router::AppState;
use crate::types::MealPlan;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GroceryListQuery {
    pub group_by: GroupBy,
}

#[derive(Debug, Deserialize)]
pub struct CheckItemRequest {
    pub key: String,
    pub checked: bool,
}

async fn owned_plan(state: &AppState, user_id: &str, plan_id: i64) -> Result<MealPlan, MealwiseError> {
    state
        .storage
        .get_plan(user_id, plan_id)
        .await?
        .ok_or(MealwiseError::NotFound("plan"))
}

fn build_for_plan(plan: &MealPlan, group_by: GroupBy) -> GroceryList {
    let meals: Vec<MealIngredients<'_>> = plan
        .meals
        .iter()
        .map(|m| MealIngredients {
            meal_name: &m.recipe.name,
            ingredients: &m.recipe.ingredients,
        })
        .collect();
    build_grocery_list(&meals, group_by)
}

/// Reuse the stored snapshot when the grouping matches; otherwise rebuild,
/// carrying over checked keys that still exist.
async fn current_list(
    state: &AppState,
    plan: &MealPlan,
    group_by: GroupBy,
) -> Result<StoredGroceryList, MealwiseError> {
    let stored = state.storage.get_grocery_list(plan.id).await?;
    if let Some(stored) = stored.as_ref()
        && stored.group_by == group_by
    {
        return Ok(stored.clone());
    }

    let list = build_for_plan(plan, group_by);
    let checked: Vec<String> = stored
        .map(|s| s.checked)
        .unwrap_or_default()
        .into_iter()
        .filter(|k| list.contains_key(k))
        .collect();
    state
        .storage
        .save_grocery_list(plan.id, &plan.user_id, &list, &checked)
        .await?;
    debug!(plan_id = plan.id, items = list.item_count(), group_by = group_by.as_str(), "grocery list built");
    Ok(StoredGroceryList {
        group_by,
        list,
        checked,
    })
}

/// GET /api/plans/{id}/grocery-list?group_by=category|meal
pub async fn get_grocery_list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(plan_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<GroceryListQuery>,
) -> Result<Json<GroceryList>, MealwiseError> {
    let plan = owned_plan(&state, &user_id, plan_id).await?;
    let StoredGroceryList { mut list, checked, .. } =
        current_list(&state, &plan, query.group_by).await?;
    list.apply_checked(&checked);
    Ok(Json(list))
}

/// PUT /api/plans/{id}/grocery-list/checked
pub async fn set_checked(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(plan_id): ApiPath<i64>,
    ApiJson(req): ApiJson<CheckItemRequest>,
) -> Result<Json<GroceryList>, MealwiseError> {
    let plan = owned_plan(&state, &user_id, plan_id).await?;
    let group_by = state
        .storage
        .get_grocery_list(plan.id)
        .await?
        .map(|s| s.group_by)
        .unwrap_or_default();
    let StoredGroceryList {
        mut list,
        mut checked,
        ..
    } = current_list(&state, &plan, group_by).await?;
    if !list.contains_key(&req.key) {
        return Err(MealwiseError::NotFound("grocery item"));
    }

    checked.retain(|k| *k != req.key);
    if req.checked {
        checked.push(req.key);
    }
    state
        .storage
        .save_grocery_list(plan.id, &user_id, &list, &checked)
        .await?;
    list.apply_checked(&checked);
    Ok(Json(list))
}
