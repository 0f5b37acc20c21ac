// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TaskPilot: turn meeting notes into tasks.
//!
//! This crate provides the backend API: cookie-based sessions with rotating
//! refresh tokens, per-client rate limiting, and transcript extraction
//! through an external language model.

pub mod config;
pub mod cookies;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Db;
use error::AppError;
use services::{CredentialHasher, MeetingAnalyzer, RateLimiter, SessionManager, TokenCodec};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionManager,
    pub rate_limiter: Arc<RateLimiter>,
    /// `None` when no extraction API key is configured
    pub analyzer: Option<MeetingAnalyzer>,
}

impl AppState {
    /// Wire up services from configuration over an already-open database.
    pub fn new(config: Config, db: Db, rate_limiter: Arc<RateLimiter>) -> Result<Self, AppError> {
        let hasher = CredentialHasher::new(config.hash_memory_kib, config.hash_iterations)?;
        let codec = TokenCodec::new(&config.access_token_secret, &config.refresh_token_secret);
        let sessions = SessionManager::new(db, codec, hasher);

        let analyzer = config
            .llm_api_key
            .as_ref()
            .map(|key| MeetingAnalyzer::new(&config.llm_base_url, key, &config.llm_model))
            .transpose()?;

        Ok(Self {
            config,
            sessions,
            rate_limiter,
            analyzer,
        })
    }
}
