use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRef},
    routing::{delete, get, post, put},
};
use axum_extra::extract::cookie::Key;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::db::Storage;
use crate::error::MealwiseError;
use crate::handlers::{grocery, pinterest, plans, profile, recipes};
use crate::http::build_http_client;
use crate::import::Importer;
use crate::llm::SharedLlm;
use crate::pinterest::PinterestService;
use crate::planner::Planner;

/// Request bodies above this size are rejected with 413.
pub const BODY_LIMIT: usize = 1024 * 1024;

/// Minimum secret length accepted by the cookie jar.
const COOKIE_KEY_LEN: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub config: Arc<Config>,
    pub planner: Planner,
    pub pinterest: PinterestService,
    pub importer: Importer,
    cookie_key: Key,
}

impl AppState {
    pub fn new(
        storage: Storage,
        config: Arc<Config>,
        llm: SharedLlm,
    ) -> Result<Self, MealwiseError> {
        let http = build_http_client(Duration::from_secs(15))?;
        let planner = Planner::new(storage.clone(), llm.clone(), config.planner.clone());
        let pinterest = PinterestService::new(storage.clone(), http, config.pinterest.clone());
        let importer = Importer::new(
            storage.clone(),
            pinterest.clone(),
            llm,
            config.import.clone(),
        )?;
        let cookie_key = cookie_key(&config.basic.cookie_secret);
        Ok(Self {
            storage,
            config,
            planner,
            pinterest,
            importer,
            cookie_key,
        })
    }
}

fn cookie_key(secret: &str) -> Key {
    if secret.len() >= COOKIE_KEY_LEN
        && let Ok(key) = Key::try_from(secret.as_bytes())
    {
        return key;
    }
    warn!(
        "basic.cookie_secret is shorter than {} bytes; using a random key (OAuth cookies will not survive a restart)",
        COOKIE_KEY_LEN
    );
    Key::generate()
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> MealwiseError {
    MealwiseError::NotFound("route")
}

pub fn app_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/profile",
            get(profile::get_profile).put(profile::put_profile),
        )
        .route("/plans", post(plans::create_plan).get(plans::list_plans))
        .route("/plans/current", get(plans::current_plan))
        .route("/plans/{id}", get(plans::get_plan).delete(plans::delete_plan))
        .route("/plans/{id}/grocery-list", get(grocery::get_grocery_list))
        .route("/plans/{id}/grocery-list/checked", put(grocery::set_checked))
        .route("/meals/{id}/swap", post(plans::swap_meal))
        .route("/meals/{id}/rating", post(plans::rate_meal))
        .route("/meals/{id}/save", post(recipes::save_meal))
        .route(
            "/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipes/{id}",
            get(recipes::get_recipe).delete(recipes::delete_recipe),
        )
        .route("/pinterest/connect", get(pinterest::connect))
        .route("/pinterest/status", get(pinterest::status))
        .route("/pinterest/connection", delete(pinterest::disconnect))
        .route("/pinterest/boards", get(pinterest::list_boards))
        .route("/pinterest/boards/{id}/pins", get(pinterest::list_board_pins))
        .route("/pinterest/import", post(pinterest::import_pins));

    Router::new()
        .route("/health", get(health))
        .route("/pinterest/callback", get(pinterest::callback))
        .nest("/api", api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}
