// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rate limiting at the HTTP boundary.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;

use common::{body_json, cookie_header, register_jane};

fn login_from(ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", format!("{ip}, 10.0.0.1"))
        .body(Body::from(
            json!({"email": "nobody@x.com", "password": "Passw0rd"}).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_login_limited_per_client_ip() {
    let (app, _) = common::create_test_app();

    for _ in 0..5 {
        let response = app.clone().oneshot(login_from("198.51.100.7")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app.clone().oneshot(login_from("198.51.100.7")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: i64 = response
        .headers()
        .get(header::RETRY_AFTER)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    let body = body_json(response).await;
    assert_eq!(body["error"], "Too many login attempts. Please try again later.");
    assert!(body["resetAt"].is_string());

    // Another client is unaffected
    let response = app.oneshot(login_from("198.51.100.8")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rate_limit_runs_before_validation() {
    let (app, _) = common::create_test_app();

    for _ in 0..5 {
        app.clone()
            .oneshot(common::json_request("/api/auth/register", json!({})))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(common::json_request("/api/auth/register", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_gated_api_has_general_quota() {
    let (app, _) = common::create_test_app();
    let jane = register_jane(&app).await;
    let cookies = cookie_header(Some(&jane.access), Some(&jane.refresh));

    let me = || {
        Request::builder()
            .uri("/api/auth/me")
            .header(header::COOKIE, &cookies)
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..60 {
        let response = app.clone().oneshot(me()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app.oneshot(me()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
