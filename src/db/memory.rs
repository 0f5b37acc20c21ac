// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process storage backend.
//!
//! Used for local development and tests. Each user's refresh records live
//! under one map entry, so every per-user mutation holds that entry's shard
//! lock for its whole read-modify-write.

use crate::error::AppError;
use crate::models::{RefreshTokenRecord, User};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct MemoryDb {
    users: DashMap<String, User>,
    /// Lowercased email -> user ID
    emails: DashMap<String, String>,
    /// User ID -> that user's refresh records
    refresh_tokens: DashMap<String, Vec<RefreshTokenRecord>>,
    /// Simulated outage; every call through `Db` fails while set
    unavailable: AtomicBool,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every storage call fail (or succeed again), to exercise the
    /// callers' failure paths.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database("in-memory store unavailable".to_string()));
        }
        Ok(())
    }

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|u| u.clone())
    }

    pub fn get_user_by_email(&self, email: &str) -> Option<User> {
        let user_id = self.emails.get(email).map(|id| id.clone())?;
        self.get_user(&user_id)
    }

    /// Insert a new user; the email index entry is claimed atomically.
    pub fn create_user(&self, user: &User) -> Result<(), AppError> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            )),
            Entry::Vacant(slot) => {
                self.users.insert(user.id.clone(), user.clone());
                slot.insert(user.id.clone());
                Ok(())
            }
        }
    }

    pub fn insert_refresh_token(&self, record: &RefreshTokenRecord) {
        self.refresh_tokens
            .entry(record.user_id.clone())
            .or_default()
            .push(record.clone());
    }

    pub fn get_refresh_tokens(&self, user_id: &str) -> Vec<RefreshTokenRecord> {
        self.refresh_tokens
            .get(user_id)
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Remove every refresh record of a user. Returns how many were removed.
    pub fn delete_refresh_tokens(&self, user_id: &str) -> usize {
        self.refresh_tokens
            .remove(user_id)
            .map(|(_, records)| records.len())
            .unwrap_or(0)
    }

    /// Compare-and-swap: replace all of a user's records with `new_record`,
    /// but only while `expected_id` is still among them.
    pub fn replace_refresh_tokens(
        &self,
        user_id: &str,
        expected_id: &str,
        new_record: &RefreshTokenRecord,
    ) -> bool {
        match self.refresh_tokens.get_mut(user_id) {
            Some(mut records) if records.iter().any(|r| r.id == expected_id) => {
                *records = vec![new_record.clone()];
                true
            }
            _ => false,
        }
    }
}
