// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persisted refresh-token records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One issued, not-yet-revoked refresh token.
///
/// Only the salted hash of the token is stored; the raw value is never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Record ID (UUID, also used as document ID)
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Argon2id PHC string of the raw refresh token
    pub token_hash: String,
    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
