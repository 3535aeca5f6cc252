use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use mealwise::config::Config;
use mealwise::db::Storage;
use mealwise::llm::{CompletionRequest, LlmClient};
use mealwise::router::{AppState, app_router};
use mealwise::MealwiseError;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

const KEY: &str = "test-service-key";

/// Always proposes the same six dinners; counts calls.
#[derive(Default)]
struct CannedLlm {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmClient for CannedLlm {
    async fn complete(&self, _req: CompletionRequest) -> Result<String, MealwiseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let recipes: Vec<Value> = [
            ("Lemon Chicken", "2 lb chicken thighs"),
            ("Beef Chili", "1 lb ground beef"),
            ("Veggie Stir Fry", "2 cups broccoli"),
            ("Salmon Bowls", "1 lb salmon"),
            ("Black Bean Tacos", "1 can black beans"),
            ("Pesto Pasta", "12 oz pasta"),
        ]
        .iter()
        .map(|(name, main)| {
            json!({
                "name": name,
                "prep_minutes": 10,
                "cook_minutes": 20,
                "ingredients": [*main, "1 yellow onion", "2 tbsp olive oil"],
                "instructions": ["Cook it."]
            })
        })
        .collect();
        Ok(format!("Here you go:\n```json\n{}\n```", json!({ "recipes": recipes })))
    }
}

async fn app_with(llm: Arc<CannedLlm>) -> Router {
    let storage = Storage::connect("sqlite::memory:").await.unwrap();
    let mut cfg = Config::default();
    cfg.basic.service_key = KEY.to_string();
    cfg.planner.cache_share = 0.0;
    let state = AppState::new(storage, Arc::new(cfg), llm).unwrap();
    app_router(state)
}

async fn app() -> Router {
    app_with(Arc::new(CannedLlm::default())).await
}

async fn call(app: &Router, method: &str, uri: &str, user: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", KEY)
        .header("x-user-id", user);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn onboard(app: &Router, user: &str, dinners: u32) {
    let (status, _) = call(
        app,
        "PUT",
        "/api/profile",
        user,
        Some(json!({"household_size": 2, "dinners_per_week": dinners})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_is_public() {
    let app = app().await;
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejects_wrong_key_and_missing_user() {
    let app = app().await;
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/profile")
                .header("authorization", "Bearer nope")
                .header("x-user-id", "u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value =
        serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/profile")
                .header("authorization", format!("Bearer {KEY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_route_uses_error_envelope() {
    let app = app().await;
    let (status, body) = call(&app, "GET", "/api/nothing-here", "u1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn profile_round_trip_and_validation() {
    let app = app().await;
    let (status, _) = call(&app, "GET", "/api/profile", "u1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        "PUT",
        "/api/profile",
        "u1",
        Some(json!({"household_size": 0, "dinners_per_week": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let (status, body) = call(
        &app,
        "PUT",
        "/api/profile",
        "u1",
        Some(json!({
            "household_size": 3,
            "dinners_per_week": 4,
            "disliked_ingredients": [" Cilantro ", "cilantro"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["onboarding_completed"], true);
    assert_eq!(body["disliked_ingredients"], json!(["cilantro"]));

    let (status, body) = call(&app, "GET", "/api/profile", "u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["household_size"], 3);
}

#[tokio::test]
async fn plan_requires_onboarding() {
    let app = app().await;
    let (status, body) = call(&app, "POST", "/api/plans", "u1", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "PROFILE_INCOMPLETE");
}

#[tokio::test]
async fn plan_generation_history_and_meal_actions() {
    let llm = Arc::new(CannedLlm::default());
    let app = app_with(llm.clone()).await;
    onboard(&app, "u1", 3).await;

    let (status, plan) = call(
        &app,
        "POST",
        "/api/plans",
        "u1",
        Some(json!({"week_of": "2024-03-14"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(plan["week_start"], "2024-03-11");
    let meals = plan["meals"].as_array().unwrap();
    assert_eq!(meals.len(), 3);
    assert_eq!(meals[0]["recipe"]["servings"], 2);
    let days: Vec<i64> = meals.iter().map(|m| m["day_of_week"].as_i64().unwrap()).collect();
    assert_eq!(days, vec![0, 2, 4]);
    let plan_id = plan["id"].as_i64().unwrap();

    let (status, history) = call(&app, "GET", "/api/plans", "u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["meal_count"], 3);

    // another user cannot see it
    let (status, _) = call(&app, "GET", &format!("/api/plans/{plan_id}"), "u2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let meal_id = meals[0]["id"].as_i64().unwrap();
    let (status, swapped) = call(&app, "POST", &format!("/api/meals/{meal_id}/swap"), "u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(swapped["recipe"]["name"], "Salmon Bowls");
    assert_eq!(swapped["day_of_week"], 0);

    let (status, rated) = call(
        &app,
        "POST",
        &format!("/api/meals/{meal_id}/rating"),
        "u1",
        Some(json!({"rating": "liked"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rated["rating"], "liked");

    let (status, saved) = call(&app, "POST", &format!("/api/meals/{meal_id}/save"), "u1", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, again) = call(&app, "POST", &format!("/api/meals/{meal_id}/save"), "u1", None).await;
    assert_eq!(saved["id"], again["id"]);

    let (status, _) = call(&app, "DELETE", &format!("/api/plans/{plan_id}"), "u1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "DELETE", &format!("/api/plans/{plan_id}"), "u1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn grocery_list_consolidates_and_keeps_checked_state() {
    let app = app().await;
    onboard(&app, "u1", 3).await;
    let (_, plan) = call(&app, "POST", "/api/plans", "u1", Some(json!({}))).await;
    let plan_id = plan["id"].as_i64().unwrap();
    let uri = format!("/api/plans/{plan_id}/grocery-list");

    let (status, list) = call(&app, "GET", &uri, "u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["group_by"], "category");
    let items: Vec<&Value> = list["sections"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|s| s["items"].as_array().unwrap())
        .collect();
    let onion = items
        .iter()
        .find(|i| i["name"].as_str().unwrap().contains("onion"))
        .unwrap();
    assert_eq!(onion["quantity"], 3.0);
    assert_eq!(onion["meals"].as_array().unwrap().len(), 3);
    let oil = items
        .iter()
        .find(|i| i["name"].as_str().unwrap().contains("olive oil"))
        .unwrap();
    assert_eq!(oil["unit"], "tbsp");
    assert_eq!(oil["quantity"], 6.0);

    let key = onion["key"].as_str().unwrap().to_string();
    let (status, list) = call(
        &app,
        "PUT",
        &format!("{uri}/checked"),
        "u1",
        Some(json!({"key": key, "checked": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let checked = |list: &Value| -> Vec<String> {
        list["sections"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|s| s["items"].as_array().unwrap())
            .filter(|i| i["checked"] == true)
            .map(|i| i["key"].as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(checked(&list), vec![key.clone()]);

    let (_, list) = call(&app, "GET", &uri, "u1", None).await;
    assert_eq!(checked(&list), vec![key.clone()]);

    let (status, by_meal) = call(&app, "GET", &format!("{uri}?group_by=meal"), "u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_meal["group_by"], "meal");
    assert_eq!(by_meal["sections"].as_array().unwrap().len(), 3);

    let (status, _) = call(
        &app,
        "PUT",
        &format!("{uri}/checked"),
        "u1",
        Some(json!({"key": "no-such-item", "checked": true})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "GET", &format!("{uri}?group_by=aisle"), "u1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cookbook_rejects_duplicates_and_searches() {
    let app = app().await;
    let recipe = json!({
        "name": "Weeknight Ramen",
        "ingredients": [{"name": "ramen noodles", "quantity": 2.0, "unit": "package"}],
        "instructions": ["Boil."]
    });
    let (status, saved) = call(&app, "POST", "/api/recipes", "u1", Some(recipe.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(saved["origin"], "manual");

    let mut shouty = recipe.clone();
    shouty["name"] = json!("  weeknight RAMEN ");
    let (status, body) = call(&app, "POST", "/api/recipes", "u1", Some(shouty)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_RECIPE");

    // other users have their own cookbook
    let (status, _) = call(&app, "POST", "/api/recipes", "u2", Some(recipe)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, found) = call(&app, "GET", "/api/recipes?q=ramen", "u1", None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    let (_, none) = call(&app, "GET", "/api/recipes?q=curry", "u1", None).await;
    assert!(none.as_array().unwrap().is_empty());

    let (status, _) = call(&app, "POST", "/api/recipes", "u1", Some(json!({"name": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = saved["id"].as_i64().unwrap();
    let (status, _) = call(&app, "DELETE", &format!("/api/recipes/{id}"), "u1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", &format!("/api/recipes/{id}"), "u1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_body_returns_413() {
    let app = app().await;
    let huge = "a".repeat(mealwise::router::BODY_LIMIT + 1024);
    let (status, body) = call(
        &app,
        "POST",
        "/api/recipes",
        "u1",
        Some(json!({"name": "Big", "description": huge})),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn pinterest_status_without_connection() {
    let app = app().await;
    let (status, body) = call(&app, "GET", "/api/pinterest/status", "u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], false);

    let (status, body) = call(
        &app,
        "POST",
        "/api/pinterest/import",
        "u1",
        Some(json!({"pin_ids": ["123"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "PINTEREST_NOT_CONNECTED");

    let (status, _) = call(&app, "DELETE", "/api/pinterest/connection", "u1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn pinterest_callback_without_cookies_is_rejected() {
    let app = app().await;
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/pinterest/callback?code=abc&state=xyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
