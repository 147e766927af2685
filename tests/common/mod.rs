// Shared helpers for the integration tests
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use karigar_connect::{
    app,
    services::storage::{MemoryStorage, Storage},
    utils::config::{AppConfig, Environment},
    AppState,
};

/// Test configuration: cheap password hashing and no credential throttling
pub fn test_config() -> AppConfig {
    AppConfig {
        environment: Environment::Test,
        jwt_secret: "integration-test-secret".to_string(),
        scrypt_log_n: 4,
        auth_rate_limit_max: 0,
        ..AppConfig::default()
    }
}

pub fn test_state(config: AppConfig, storage: Arc<dyn Storage>) -> AppState {
    AppState::new(config, storage).unwrap()
}

/// Router over a fresh in-memory store
pub async fn setup_test_app() -> Router {
    setup_test_app_with(test_config()).await
}

pub async fn setup_test_app_with(config: AppConfig) -> Router {
    app(test_state(config, Arc::new(MemoryStorage::new())))
}

/// Sends a request and decodes the JSON body (`Null` when empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post(app: &Router, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub async fn patch(app: &Router, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    send(app, Method::PATCH, uri, token, Some(body)).await
}

/// Registers `username` with password "secret123"; returns `(token, user)`.
pub async fn register(app: &Router, username: &str) -> (String, Value) {
    let (status, json) = post(
        app,
        "/api/register",
        None,
        json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret123",
            "firstName": "Test",
            "lastName": "User"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", json);

    let token = json["data"]["token"].as_str().unwrap().to_string();
    (token, json["data"]["user"].clone())
}

/// Registers a user and gives them an artisan profile.
pub async fn register_artisan(app: &Router, username: &str) -> (String, i64) {
    let (token, user) = register(app, username).await;
    let (status, json) = post(
        app,
        "/api/artisans",
        Some(&token),
        json!({ "craft": "Block printing", "story": "Three generations of printers" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "artisan profile failed: {}", json);

    (token, user["id"].as_i64().unwrap())
}

pub async fn create_category(app: &Router, token: &str, name: &str) -> i64 {
    let (status, json) = post(
        app,
        "/api/categories",
        Some(token),
        json!({ "name": name, "description": "Handmade goods" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "category failed: {}", json);
    json["data"]["id"].as_i64().unwrap()
}

pub fn product_body(artisan_id: i64, category_id: i64) -> Value {
    json!({
        "name": "Indigo table runner",
        "description": "Hand block printed cotton runner",
        "price": 1200.0,
        "categoryId": category_id,
        "artisanId": artisan_id,
        "stock": 4
    })
}
