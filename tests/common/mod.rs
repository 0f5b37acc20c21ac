// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use taskpilot::config::Config;
use taskpilot::db::{Db, MemoryDb};
use taskpilot::routes::create_router;
use taskpilot::services::RateLimiter;
use taskpilot::AppState;
use tower::ServiceExt;

/// Create a test app over in-memory storage.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(
        AppState::new(config, Db::in_memory(), Arc::new(RateLimiter::new()))
            .expect("Failed to build test state"),
    );
    (create_router(state.clone()), state)
}

/// Create a test app and keep a handle to its storage, so a test can
/// simulate an outage mid-flow.
#[allow(dead_code)]
pub fn create_test_app_with_storage() -> (Router, Arc<AppState>, Arc<MemoryDb>) {
    let storage = Arc::new(MemoryDb::new());
    let state = Arc::new(
        AppState::new(
            Config::test_default(),
            Db::from_memory(storage.clone()),
            Arc::new(RateLimiter::new()),
        )
        .expect("Failed to build test state"),
    );
    (create_router(state.clone()), state, storage)
}

/// `Set-Cookie` header values of a response.
#[allow(dead_code)]
pub fn set_cookie_headers<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Value of cookie `name` as set by the response.
#[allow(dead_code)]
pub fn cookie_value(headers: &[String], name: &str) -> String {
    let cookie = find_cookie(headers, name);
    cookie[name.len() + 1..]
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Cookie request header for an access/refresh pair.
#[allow(dead_code)]
pub fn cookie_header(access: Option<&str>, refresh: Option<&str>) -> String {
    let mut parts = Vec::new();
    if let Some(access) = access {
        parts.push(format!("access_token={access}"));
    }
    if let Some(refresh) = refresh {
        parts.push(format!("refresh_token={refresh}"));
    }
    parts.join("; ")
}

#[allow(dead_code)]
pub fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn get_with_cookies(uri: &str, cookies: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, cookies)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub fn post_with_cookies(uri: &str, cookies: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookies)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Tokens issued by a successful registration.
#[allow(dead_code)]
pub struct Registered {
    pub access: String,
    pub refresh: String,
    pub user_id: String,
}

/// Register Jane and return her session cookies.
#[allow(dead_code)]
pub async fn register_jane(app: &Router) -> Registered {
    let response = app
        .clone()
        .oneshot(json_request(
            "/api/auth/register",
            serde_json::json!({
                "name": "Jane",
                "email": "jane@x.com",
                "password": "Passw0rd"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);

    let cookies = set_cookie_headers(&response);
    let body = body_json(response).await;
    Registered {
        access: cookie_value(&cookies, "access_token"),
        refresh: cookie_value(&cookies, "refresh_token"),
        user_id: body["user"]["id"].as_str().unwrap().to_string(),
    }
}
