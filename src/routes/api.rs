// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::{auth::AuthUser, rate_limit::enforce};
use crate::models::TranscriptAnalysis;
use crate::routes::auth::json_body;
use crate::services::rate_limit::AI_RATE_LIMIT;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Extraction routes. The session gate is applied in routes/mod.rs; these
/// routes carry only the AI quota.
pub fn ai_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/meetings/extract", post(extract_action_items))
}

// ─── Meeting Extraction ──────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct ExtractRequest {
    #[serde(default)]
    #[validate(length(
        min = 10,
        max = 50000,
        message = "Transcript must be between 10 and 50000 characters"
    ))]
    pub transcript: String,
}

/// Summarize a meeting transcript and extract the caller's action items.
async fn extract_action_items(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    headers: HeaderMap,
    body: std::result::Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<TranscriptAnalysis>> {
    enforce(
        &state.rate_limiter,
        "ai",
        &headers,
        AI_RATE_LIMIT,
        "Too many AI requests. Please try again later.",
    )?;

    let mut req = json_body(body)?;
    req.transcript = req.transcript.trim().to_string();
    req.validate()?;

    let user = state
        .sessions
        .user_by_id(&auth.id)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    let analyzer = state
        .analyzer
        .as_ref()
        .ok_or_else(|| AppError::Extraction("Extraction service is not configured".to_string()))?;

    let analysis = analyzer.analyze(&req.transcript, &user.name).await?;
    tracing::info!(
        user_id = %user.id,
        action_items = analysis.action_items.len(),
        "Extracted action items"
    );

    Ok(Json(analysis))
}
