use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::{DateTime, Utc};
use oauth2::CsrfToken;
use serde::{Deserialize, Serialize};
use serde_json::json;
use subtle::ConstantTimeEq;
use time::Duration;
use tracing::{info, warn};

use crate::error::MealwiseError;
use crate::import::ImportReport;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::pinterest::{Board, Page, PinSummary};
use crate::router::AppState;

const CSRF_COOKIE: &str = "pinterest_csrf_token";
const USER_COOKIE: &str = "pinterest_connect_user";

#[derive(Debug, Deserialize)]
pub struct PinterestCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BookmarkQuery {
    pub bookmark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportPinsRequest {
    pub pin_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub username: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
}

/// GET /api/pinterest/connect -> authorize URL; the browser follows it.
/// The CSRF state and the acting user ride along in encrypted cookies.
pub async fn connect(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, MealwiseError> {
    let (auth_url, csrf_token) = state.pinterest.authorize_url()?;
    let secure = !state.config.basic.insecure_cookie;
    let jar = store_connect_cookies(jar, &csrf_token, &user_id, secure);

    info!(user_id = %user_id, "dispatching Pinterest OAuth redirect");
    Ok((jar, Json(json!({ "authorize_url": auth_url.as_str() }))))
}

/// GET /pinterest/callback -> exchanges the code and stores the connection.
pub async fn callback(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PinterestCallbackQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let (csrf_cookie, user_id, jar) = match load_connect_session(jar) {
        Ok(data) => data,
        Err((jar, err)) => return respond_with_error(jar, err),
    };

    if let Some(error) = query.error.as_deref() {
        return respond_with_error(
            jar,
            MealwiseError::OauthFlowError(format!("authorization denied: {error}")),
        );
    }

    let Some(state_param) = query.state.as_deref() else {
        return respond_with_error(
            jar,
            MealwiseError::OauthFlowError("missing `state` in callback".to_string()),
        );
    };
    if !bool::from(state_param.as_bytes().ct_eq(csrf_cookie.as_bytes())) {
        return respond_with_error(
            jar,
            MealwiseError::OauthFlowError("CSRF token mismatch".to_string()),
        );
    }

    let Some(code) = query.code else {
        return respond_with_error(
            jar,
            MealwiseError::OauthFlowError("missing `code` in callback".to_string()),
        );
    };

    if let Err(err) = state.pinterest.complete_connect(&user_id, code).await {
        warn!(user_id = %user_id, "Pinterest connect failed: {}", err);
        return respond_with_error(jar, err);
    }

    (
        jar,
        Redirect::to(&state.config.pinterest.post_connect_redirect),
    )
        .into_response()
}

/// GET /api/pinterest/status
pub async fn status(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ConnectionStatus>, MealwiseError> {
    let status = match state.pinterest.status(&user_id).await? {
        Some(conn) => ConnectionStatus {
            connected: true,
            username: conn.username,
            expires_at: Some(conn.expires_at),
            scope: conn.scope,
        },
        None => ConnectionStatus {
            connected: false,
            username: None,
            expires_at: None,
            scope: None,
        },
    };
    Ok(Json(status))
}

/// DELETE /api/pinterest/connection -> idempotent.
pub async fn disconnect(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<StatusCode, MealwiseError> {
    state.pinterest.disconnect(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/pinterest/boards?bookmark=
pub async fn list_boards(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiQuery(query): ApiQuery<BookmarkQuery>,
) -> Result<Json<Page<Board>>, MealwiseError> {
    Ok(Json(
        state
            .pinterest
            .list_boards(&user_id, query.bookmark.as_deref())
            .await?,
    ))
}

/// GET /api/pinterest/boards/{id}/pins?bookmark=
pub async fn list_board_pins(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(board_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<BookmarkQuery>,
) -> Result<Json<Page<PinSummary>>, MealwiseError> {
    Ok(Json(
        state
            .pinterest
            .list_board_pins(&user_id, &board_id, query.bookmark.as_deref())
            .await?,
    ))
}

/// POST /api/pinterest/import
pub async fn import_pins(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(req): ApiJson<ImportPinsRequest>,
) -> Result<Json<ImportReport>, MealwiseError> {
    Ok(Json(
        state.importer.import_pins(&user_id, &req.pin_ids).await?,
    ))
}

fn store_connect_cookies(
    jar: PrivateCookieJar,
    csrf: &CsrfToken,
    user_id: &str,
    secure: bool,
) -> PrivateCookieJar {
    jar.add(build_cookie(CSRF_COOKIE, csrf.secret().to_string(), secure))
        .add(build_cookie(USER_COOKIE, user_id.to_string(), secure))
}

fn load_connect_session(
    jar: PrivateCookieJar,
) -> Result<(String, String, PrivateCookieJar), (PrivateCookieJar, MealwiseError)> {
    let csrf_cookie = jar.get(CSRF_COOKIE).map(|c| c.value().to_owned());
    let user_cookie = jar.get(USER_COOKIE).map(|c| c.value().to_owned());
    let jar = clear_connect_cookies(jar);

    let Some(csrf_cookie) = csrf_cookie else {
        return Err((
            jar,
            MealwiseError::OauthFlowError("missing CSRF token in cookie".to_string()),
        ));
    };
    let Some(user_id) = user_cookie.filter(|u| !u.is_empty()) else {
        return Err((
            jar,
            MealwiseError::OauthFlowError("missing user in cookie".to_string()),
        ));
    };
    Ok((csrf_cookie, user_id, jar))
}

fn clear_connect_cookies(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(clear_cookie(CSRF_COOKIE))
        .remove(clear_cookie(USER_COOKIE))
}

fn build_cookie(name: &str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(15))
        .build()
}

fn clear_cookie(name: &str) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), ""))
        .path("/")
        .build()
}

fn respond_with_error(jar: PrivateCookieJar, err: MealwiseError) -> Response {
    (jar, err.into_response()).into_response()
}
