// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Signing secrets are read once at startup. A missing or unusable secret is
//! a fatal startup error, never a per-request one.

use std::env;

/// Default Argon2id memory cost in KiB (RFC 9106 memory-constrained profile).
/// The OWASP floor is 19 MiB with 2 iterations.
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 64 * 1024;
/// Default Argon2id iteration count.
pub const DEFAULT_HASH_ITERATIONS: u32 = 3;

const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Whether cookies carry the `Secure` flag (production only)
    pub secure_cookies: bool,
    /// GCP project ID; selects the Firestore backend when present
    pub gcp_project_id: Option<String>,
    /// Argon2id memory cost (KiB)
    pub hash_memory_kib: u32,
    /// Argon2id iterations
    pub hash_iterations: u32,
    /// Period of the rate limiter sweep, in seconds
    pub rate_limit_sweep_secs: u64,
    /// Base URL of the OpenAI-compatible extraction service
    pub llm_base_url: String,
    /// Model name sent to the extraction service
    pub llm_model: String,

    // --- Secrets ---
    /// Signing key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// Signing key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    /// API key for the extraction service
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let access_token_secret = required_secret("JWT_SECRET")?;
        let refresh_token_secret = required_secret("JWT_REFRESH_SECRET")?;
        if access_token_secret == refresh_token_secret {
            return Err(ConfigError::Invalid(
                "JWT_SECRET and JWT_REFRESH_SECRET must differ",
            ));
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            secure_cookies: app_env.eq_ignore_ascii_case("production"),
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            hash_memory_kib: parse_or("PASSWORD_HASH_MEMORY_KIB", DEFAULT_HASH_MEMORY_KIB),
            hash_iterations: parse_or("PASSWORD_HASH_ITERATIONS", DEFAULT_HASH_ITERATIONS),
            rate_limit_sweep_secs: parse_or("RATE_LIMIT_SWEEP_SECS", 60),
            llm_base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            access_token_secret,
            refresh_token_secret,
            llm_api_key: env::var("GROQ_API_KEY")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }

    /// Fixed configuration for tests: in-memory storage and a cheap hash.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            secure_cookies: false,
            gcp_project_id: None,
            hash_memory_kib: 1024,
            hash_iterations: 1,
            rate_limit_sweep_secs: 60,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            access_token_secret: b"test_access_secret_32_bytes_min!".to_vec(),
            refresh_token_secret: b"test_refresh_secret_32_bytes_mn!".to_vec(),
            llm_api_key: None,
        }
    }
}

fn required_secret(name: &'static str) -> Result<Vec<u8>, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value.as_bytes().to_vec())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}
