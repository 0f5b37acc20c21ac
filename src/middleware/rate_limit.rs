// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rate limiting at the HTTP boundary.

use crate::error::AppError;
use crate::services::rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter, API_RATE_LIMIT};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Client address for rate-limit keys: the first `X-Forwarded-For` entry,
/// or `"unknown"`.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Count a request against `"<scope>:<ip>"`, failing with
/// `AppError::RateLimited` when the quota is spent.
pub fn enforce(
    limiter: &RateLimiter,
    scope: &str,
    headers: &HeaderMap,
    policy: RateLimitPolicy,
    message: &'static str,
) -> Result<RateLimitDecision, AppError> {
    let key = format!("{}:{}", scope, client_ip(headers));
    let decision = limiter.check(&key, policy);

    if !decision.allowed {
        tracing::warn!(key = %key, reset_at = %decision.reset_at, "Rate limit exceeded");
        return Err(AppError::RateLimited {
            message,
            reset_at: decision.reset_at,
        });
    }
    Ok(decision)
}

/// Middleware applying the general API quota.
pub async fn api_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    match enforce(
        &state.rate_limiter,
        "api",
        request.headers(),
        API_RATE_LIMIT,
        "Too many requests. Please try again later.",
    ) {
        Ok(_) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}
