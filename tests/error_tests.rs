// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use std::collections::BTreeMap;
use taskpilot::error::{AppError, GENERIC_ERROR_MESSAGE};

mod common;

#[tokio::test]
async fn test_internal_detail_never_leaks() {
    for err in [
        AppError::Internal(anyhow::anyhow!("connection string postgres://secret")),
        AppError::Database("deadline exceeded on users/abc".to_string()),
    ] {
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = common::body_json(response).await;
        assert_eq!(body, serde_json::json!({"error": GENERIC_ERROR_MESSAGE}));
    }
}

#[tokio::test]
async fn test_auth_errors_are_generic() {
    let response = AppError::InvalidCredentials.into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        common::body_json(response).await["error"],
        "Invalid email or password"
    );

    assert_eq!(
        AppError::InvalidToken.into_response().status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        AppError::Forbidden.into_response().status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_rate_limited_carries_reset_time() {
    let response = AppError::RateLimited {
        message: "Too many requests",
        reset_at: Utc::now() + Duration::seconds(30),
    }
    .into_response();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: i64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((29..=30).contains(&retry_after));

    let body = common::body_json(response).await;
    assert_eq!(body["error"], "Too many requests");
    assert!(body["resetAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_validation_lists_fields() {
    let fields = BTreeMap::from([(
        "email".to_string(),
        vec!["Invalid email address".to_string()],
    )]);
    let response = AppError::Validation(fields).into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["errors"]["email"][0], "Invalid email address");
}

#[tokio::test]
async fn test_not_found_and_conflict() {
    let response = AppError::NotFound("User".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(common::body_json(response).await["error"], "User not found");

    let response = AppError::Conflict("Email taken".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(common::body_json(response).await["error"], "Email taken");
}
