use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use crate::error::MealwiseError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::router::AppState;
use crate::types::{Recipe, RecipeOrigin, SavedRecipe};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecipeSearch {
    pub q: Option<String>,
}

/// GET /api/recipes?q=
pub async fn list_recipes(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiQuery(search): ApiQuery<RecipeSearch>,
) -> Result<Json<Vec<SavedRecipe>>, MealwiseError> {
    Ok(Json(
        state
            .storage
            .list_saved(&user_id, search.q.as_deref())
            .await?,
    ))
}

/// POST /api/recipes -> adds a hand-entered recipe to the cookbook.
pub async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(mut recipe): ApiJson<Recipe>,
) -> Result<impl IntoResponse, MealwiseError> {
    recipe.name = recipe.name.trim().to_string();
    if recipe.name.is_empty() {
        return Err(MealwiseError::Validation("name must not be empty".to_string()));
    }
    let saved = state
        .storage
        .insert_saved(&user_id, &recipe, RecipeOrigin::Manual)
        .await?;
    info!(user_id = %user_id, recipe_id = saved.id, "recipe added to cookbook");
    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /api/recipes/{id}
pub async fn get_recipe(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<SavedRecipe>, MealwiseError> {
    state
        .storage
        .get_saved(&user_id, id)
        .await?
        .map(Json)
        .ok_or(MealwiseError::NotFound("recipe"))
}

/// DELETE /api/recipes/{id}
pub async fn delete_recipe(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, MealwiseError> {
    if state.storage.delete_saved(&user_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(MealwiseError::NotFound("recipe"))
    }
}

/// POST /api/meals/{id}/save -> copies a planned meal into the cookbook.
pub async fn save_meal(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(meal_id): ApiPath<i64>,
) -> Result<Json<SavedRecipe>, MealwiseError> {
    Ok(Json(state.planner.save_meal(&user_id, meal_id).await?))
}
