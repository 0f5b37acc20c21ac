// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request gate: session authentication middleware.
//!
//! A request without an access cookie is unauthenticated. A valid access
//! cookie lets the request through. An expired or invalid one gets exactly
//! one transparent refresh through the session manager; if that rotates,
//! the new cookies ride on the downstream response and the handler never
//! sees the difference. Unauthenticated page routes redirect to `/login`,
//! `/api/*` routes get a 401 envelope.

use crate::cookies;
use crate::error::AppError;
use crate::services::token::Claims;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Authenticated identity, available to handlers as `Extension<AuthUser>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
        }
    }
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Middleware that requires a session, refreshing it once if needed.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let api = is_api_path(request.uri().path());
    let secure = state.config.secure_cookies;

    let Some(access_token) = cookies::access_token(&jar) else {
        return unauthenticated(api, jar, secure);
    };

    if let Some(claims) = state.sessions.verify_access(access_token) {
        request.extensions_mut().insert(AuthUser::from(claims));
        return next.run(request).await;
    }

    let Some(refresh_token) = cookies::refresh_token(&jar).map(str::to_string) else {
        return unauthenticated(api, jar, secure);
    };

    match state.sessions.refresh(&refresh_token).await {
        Ok(session) => {
            tracing::debug!(user_id = %session.user.id, "Session refreshed at gate");
            request.extensions_mut().insert(AuthUser {
                id: session.user.id.clone(),
                email: session.user.email.clone(),
            });
            let jar = cookies::set_session_cookies(jar, &session.tokens, secure);
            (jar, next.run(request).await).into_response()
        }
        Err(AppError::InvalidToken) => unauthenticated(api, jar, secure),
        Err(e) => {
            // Storage failure: fail closed, but keep the cookies so a
            // later request can retry the refresh.
            tracing::error!(error = %e, "Refresh at gate failed");
            if api {
                AppError::Unauthenticated.into_response()
            } else {
                Redirect::temporary(LOGIN_PATH).into_response()
            }
        }
    }
}

fn unauthenticated(api: bool, jar: CookieJar, secure: bool) -> Response {
    let jar = cookies::clear_session_cookies(jar, secure);
    if api {
        (jar, AppError::Unauthenticated).into_response()
    } else {
        (jar, Redirect::temporary(LOGIN_PATH)).into_response()
    }
}

/// Middleware for the login and registration pages: a visitor who already
/// holds a valid access token is sent to the dashboard instead.
pub async fn redirect_authenticated(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let signed_in = cookies::access_token(&jar)
        .and_then(|t| state.sessions.verify_access(t))
        .is_some();

    if signed_in {
        return Redirect::temporary(DASHBOARD_PATH).into_response();
    }
    next.run(request).await
}
