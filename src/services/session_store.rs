// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side record of valid refresh tokens.
//!
//! Only salted hashes are stored, so a stored hash can't be looked up by
//! equality: matching verifies the raw token against each live record of the
//! user in turn. Every rotation and login revokes the user's other records,
//! which keeps that scan at about one record.

use crate::db::Db;
use crate::error::AppError;
use crate::models::RefreshTokenRecord;
use crate::services::password::CredentialHasher;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Clone)]
pub struct SessionStore {
    db: Db,
    hasher: CredentialHasher,
}

impl SessionStore {
    pub fn new(db: Db, hasher: CredentialHasher) -> Self {
        Self { db, hasher }
    }

    /// Hash a raw refresh token for storage.
    pub async fn hash_token(&self, raw_token: &str) -> Result<String, AppError> {
        self.hasher.hash_blocking(raw_token).await
    }

    fn new_record(user_id: &str, token_hash: String, expires_at: DateTime<Utc>) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            token_hash,
            expires_at,
            created_at: Utc::now(),
        }
    }

    /// Persist a new refresh record for `user_id`.
    pub async fn create_refresh_record(
        &self,
        user_id: &str,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, AppError> {
        let record = Self::new_record(user_id, token_hash, expires_at);
        self.db.create_refresh_token(&record).await?;
        Ok(record)
    }

    /// Records of `user_id` that have not yet expired.
    pub async fn list_live(&self, user_id: &str) -> Result<Vec<RefreshTokenRecord>, AppError> {
        let now = Utc::now();
        let mut records = self.db.get_refresh_tokens(user_id).await?;
        records.retain(|r| r.is_live(now));
        Ok(records)
    }

    /// Delete every record of `user_id`. Returns how many were deleted.
    pub async fn revoke_all(&self, user_id: &str) -> Result<usize, AppError> {
        let count = self.db.delete_refresh_tokens(user_id).await?;
        tracing::debug!(user_id, count, "Revoked refresh tokens");
        Ok(count)
    }

    /// First live record whose hash matches `raw_token`.
    pub async fn find_matching_record(
        &self,
        user_id: &str,
        raw_token: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        for record in self.list_live(user_id).await? {
            if self.hasher.verify_blocking(raw_token, &record.token_hash).await {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Revoke all of the user's records and store a new one, in one step, as
    /// long as `matched_id` has not been consumed by a concurrent rotation.
    ///
    /// Returns `None` if another rotation got there first.
    pub async fn rotate(
        &self,
        user_id: &str,
        matched_id: &str,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let record = Self::new_record(user_id, token_hash, expires_at);
        let swapped = self
            .db
            .replace_refresh_tokens(user_id, matched_id, &record)
            .await?;
        Ok(swapped.then_some(record))
    }
}
