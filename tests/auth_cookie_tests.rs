// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth cookie attribute tests.
//!
//! These tests verify session cookie attributes on login and logout for
//! development and production configurations.

use axum::http::{header, StatusCode};
use serde_json::json;
use taskpilot::config::Config;
use tower::ServiceExt;

mod common;

use common::{find_cookie, json_request, post_with_cookies, register_jane, set_cookie_headers};

#[tokio::test]
async fn test_login_cookie_attributes_development() {
    let (app, _) = common::create_test_app();
    register_jane(&app).await;

    let response = app
        .oneshot(json_request(
            "/api/auth/login",
            json!({"email": "jane@x.com", "password": "Passw0rd"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );

    let set_cookies = set_cookie_headers(&response);
    let access = find_cookie(&set_cookies, "access_token");
    let refresh = find_cookie(&set_cookies, "refresh_token");

    for cookie in [&access, &refresh] {
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
        assert!(!cookie.contains("Domain="));
    }
    assert!(access.contains("Max-Age=900"));
    assert!(refresh.contains("Max-Age=604800"));
}

#[tokio::test]
async fn test_cookies_are_secure_in_production() {
    let config = Config {
        secure_cookies: true,
        ..Config::test_default()
    };
    let (app, _) = common::create_test_app_with_config(config);

    let response = app
        .oneshot(json_request(
            "/api/auth/register",
            json!({"name": "Jane", "email": "jane@x.com", "password": "Passw0rd"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let set_cookies = set_cookie_headers(&response);
    assert_eq!(set_cookies.len(), 2);
    assert!(set_cookies.iter().all(|c| c.contains("Secure")));
}

#[tokio::test]
async fn test_logout_cookie_removal_attributes() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(post_with_cookies(
            "/api/auth/logout",
            "access_token=test; refresh_token=test",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies = set_cookie_headers(&response);
    for name in ["access_token", "refresh_token"] {
        let cookie = find_cookie(&set_cookies, name);
        assert!(cookie.starts_with(&format!("{name}=;")));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }
}
