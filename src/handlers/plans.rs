use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::error::MealwiseError;
use crate::middleware::{ApiJson, ApiPath, CurrentUser};
use crate::planner::week_start_of;
use crate::router::AppState;
use crate::types::{Meal, MealPlan, PlanSummary, Rating};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreatePlanRequest {
    /// Any date inside the wanted week; today when absent.
    pub week_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct RateMealRequest {
    pub rating: Rating,
}

/// POST /api/plans
pub async fn create_plan(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(req): ApiJson<CreatePlanRequest>,
) -> Result<impl IntoResponse, MealwiseError> {
    let plan = state.planner.generate_plan(&user_id, req.week_of).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// GET /api/plans -> history, newest week first.
pub async fn list_plans(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<PlanSummary>>, MealwiseError> {
    Ok(Json(state.storage.list_plans(&user_id).await?))
}

/// GET /api/plans/current
pub async fn current_plan(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<MealPlan>, MealwiseError> {
    let week_start = week_start_of(Utc::now().date_naive());
    state
        .storage
        .get_plan_by_week(&user_id, week_start)
        .await?
        .map(Json)
        .ok_or(MealwiseError::NotFound("plan"))
}

/// GET /api/plans/{id}
pub async fn get_plan(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(plan_id): ApiPath<i64>,
) -> Result<Json<MealPlan>, MealwiseError> {
    state
        .storage
        .get_plan(&user_id, plan_id)
        .await?
        .map(Json)
        .ok_or(MealwiseError::NotFound("plan"))
}

/// DELETE /api/plans/{id}
pub async fn delete_plan(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(plan_id): ApiPath<i64>,
) -> Result<StatusCode, MealwiseError> {
    if state.storage.delete_plan(&user_id, plan_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(MealwiseError::NotFound("plan"))
    }
}

/// POST /api/meals/{id}/swap
pub async fn swap_meal(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(meal_id): ApiPath<i64>,
) -> Result<Json<Meal>, MealwiseError> {
    Ok(Json(state.planner.swap_meal(&user_id, meal_id).await?))
}

/// POST /api/meals/{id}/rating
pub async fn rate_meal(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(meal_id): ApiPath<i64>,
    ApiJson(req): ApiJson<RateMealRequest>,
) -> Result<Json<Meal>, MealwiseError> {
    Ok(Json(
        state.planner.rate_meal(&user_id, meal_id, req.rating).await?,
    ))
}
