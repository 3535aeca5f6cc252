use axum::{Json, extract::State};
use tracing::info;

use crate::error::MealwiseError;
use crate::middleware::{ApiJson, CurrentUser};
use crate::router::AppState;
use crate::types::{Profile, ProfileInput};

/// GET /api/profile
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Profile>, MealwiseError> {
    let profile = state
        .storage
        .get_profile(&user_id)
        .await?
        .ok_or(MealwiseError::NotFound("profile"))?;
    Ok(Json(profile))
}

/// PUT /api/profile -> validates onboarding answers and marks onboarding complete.
pub async fn put_profile(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(input): ApiJson<ProfileInput>,
) -> Result<Json<Profile>, MealwiseError> {
    let profile = input.into_profile(&user_id)?;
    state.storage.upsert_profile(&profile).await?;
    info!(user_id = %user_id, dinners = profile.dinners_per_week, "profile saved");
    Ok(Json(profile))
}
