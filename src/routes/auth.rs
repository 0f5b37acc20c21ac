// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and session routes: register, login, refresh, logout, me.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::cookies;
use crate::error::{AppError, Result};
use crate::middleware::{auth::AuthUser, rate_limit::enforce};
use crate::models::PublicUser;
use crate::services::rate_limit::AUTH_RATE_LIMIT;
use crate::services::session::normalize_email;
use crate::AppState;

/// Routes reachable without a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
}

/// Routes that sit behind the session gate.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(
        email(message = "Invalid email address"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(
        length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"),
        custom(function = "validate_password_strength")
    )]
    pub password: String,
}

impl RegisterRequest {
    fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
        self
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Require at least one lowercase letter, one uppercase letter and one digit.
fn validate_password_strength(password: &str) -> std::result::Result<(), ValidationError> {
    let checks: [(fn(&char) -> bool, &'static str); 3] = [
        (char::is_ascii_lowercase, "Password must contain at least one lowercase letter"),
        (char::is_ascii_uppercase, "Password must contain at least one uppercase letter"),
        (char::is_ascii_digit, "Password must contain at least one number"),
    ];

    for (check, message) in checks {
        if !password.chars().any(|c| check(&c)) {
            return Err(ValidationError::new("password_strength").with_message(message.into()));
        }
    }
    Ok(())
}

/// Unwrap a JSON body, turning a malformed one into a validation error.
pub(crate) fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        AppError::Validation(BTreeMap::from([(
            "body".to_string(),
            vec![rejection.body_text()],
        )]))
    })
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: PublicUser,
}

async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    body: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    enforce(
        &state.rate_limiter,
        "register",
        &headers,
        AUTH_RATE_LIMIT,
        "Too many registration attempts. Please try again later.",
    )?;

    let req = json_body(body)?.normalized();
    req.validate()?;

    let session = state
        .sessions
        .register(&req.name, &req.email, &req.password)
        .await?;

    let jar = cookies::set_session_cookies(jar, &session.tokens, state.config.secure_cookies);
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            user: session.user,
            message: "Account created successfully",
        }),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    enforce(
        &state.rate_limiter,
        "login",
        &headers,
        AUTH_RATE_LIMIT,
        "Too many login attempts. Please try again later.",
    )?;

    let mut req = json_body(body)?;
    req.email = normalize_email(&req.email);
    req.validate()?;

    let session = state.sessions.login(&req.email, &req.password).await?;

    let jar = cookies::set_session_cookies(jar, &session.tokens, state.config.secure_cookies);
    Ok((
        jar,
        Json(AuthResponse {
            user: session.user,
            message: "Logged in successfully",
        }),
    ))
}

/// Rotate the refresh cookie. Any failure clears both cookies.
async fn refresh(State(state): State<Arc<AppState>>, headers: HeaderMap, jar: CookieJar) -> Response {
    if let Err(e) = enforce(
        &state.rate_limiter,
        "refresh",
        &headers,
        AUTH_RATE_LIMIT,
        "Too many refresh attempts. Please try again later.",
    ) {
        return e.into_response();
    }

    let secure = state.config.secure_cookies;
    let Some(raw) = cookies::refresh_token(&jar).map(str::to_string) else {
        return (cookies::clear_session_cookies(jar, secure), AppError::InvalidToken).into_response();
    };

    match state.sessions.refresh(&raw).await {
        Ok(session) => (
            cookies::set_session_cookies(jar, &session.tokens, secure),
            Json(MessageResponse {
                message: "Tokens refreshed successfully",
            }),
        )
            .into_response(),
        Err(e) => (cookies::clear_session_cookies(jar, secure), e).into_response(),
    }
}

/// Revoke the user's refresh tokens. Cookies are cleared even when
/// revocation fails.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let result = state
        .sessions
        .logout(cookies::access_token(&jar), cookies::refresh_token(&jar))
        .await;

    let jar = cookies::clear_session_cookies(jar, state.config.secure_cookies);
    match result {
        Ok(_) => (
            jar,
            Json(MessageResponse {
                message: "Logged out successfully",
            }),
        )
            .into_response(),
        Err(e) => (jar, e).into_response(),
    }
}

async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let user = state
        .sessions
        .user_by_id(&user.id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    Ok(Json(MeResponse { user }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_request(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
        .normalized()
    }

    #[test]
    fn test_register_request_normalizes() {
        let req = register_request("  Jane  ", "  Jane@X.COM ", "Passw0rd");
        assert_eq!(req.name, "Jane");
        assert_eq!(req.email, "jane@x.com");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_register_request_field_errors() {
        let errors = register_request(" J ", "not-an-email", "password")
            .validate()
            .unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("Passw0rd").is_ok());
        for weak in ["passw0rd", "PASSW0RD", "Password"] {
            assert!(validate_password_strength(weak).is_err(), "{weak}");
        }
    }

    #[test]
    fn test_password_length_bounds() {
        assert!(register_request("Jane", "j@x.com", "Pa0").validate().is_err());
        let long = format!("Pa0{}", "x".repeat(126));
        assert!(register_request("Jane", "j@x.com", &long).validate().is_err());
        let max = format!("Pa0{}", "x".repeat(125));
        assert!(register_request("Jane", "j@x.com", &max).validate().is_ok());
    }

    #[test]
    fn test_login_requires_password() {
        let req = LoginRequest {
            email: "jane@x.com".to_string(),
            password: String::new(),
        };
        assert!(req.validate().unwrap_err().field_errors().contains_key("password"));
    }
}
