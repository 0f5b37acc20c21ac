// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: Firestore in production, in-process maps otherwise.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{RefreshTokenRecord, User};
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email uniqueness index (keyed by lowercased email)
    pub const USER_EMAILS: &str = "user_emails";
    pub const REFRESH_TOKENS: &str = "refresh_tokens";
}

/// Storage handle shared by all requests. Cheap to clone.
#[derive(Clone)]
pub struct Db {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreDb),
    Memory(Arc<MemoryDb>),
}

impl Db {
    /// Connect to Firestore for the given project.
    pub async fn firestore(project_id: &str) -> Result<Self, AppError> {
        Ok(Self {
            backend: Backend::Firestore(FirestoreDb::new(project_id).await?),
        })
    }

    /// Fresh, empty in-process store.
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(MemoryDb::new()))
    }

    /// Wrap an in-process store the caller keeps a handle to.
    pub fn from_memory(db: Arc<MemoryDb>) -> Self {
        Self {
            backend: Backend::Memory(db),
        }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.get_user(user_id).await,
            Backend::Memory(db) => db.check_available().map(|()| db.get_user(user_id)),
        }
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.get_user_by_email(email).await,
            Backend::Memory(db) => db.check_available().map(|()| db.get_user_by_email(email)),
        }
    }

    /// Create a user; `AppError::Conflict` if the email is taken.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.create_user(user).await,
            Backend::Memory(db) => {
                db.check_available()?;
                db.create_user(user)
            }
        }
    }

    pub async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.set_refresh_token(record).await,
            Backend::Memory(db) => {
                db.check_available()?;
                db.insert_refresh_token(record);
                Ok(())
            }
        }
    }

    pub async fn get_refresh_tokens(
        &self,
        user_id: &str,
    ) -> Result<Vec<RefreshTokenRecord>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.get_refresh_tokens(user_id).await,
            Backend::Memory(db) => db.check_available().map(|()| db.get_refresh_tokens(user_id)),
        }
    }

    pub async fn delete_refresh_tokens(&self, user_id: &str) -> Result<usize, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.delete_refresh_tokens(user_id).await,
            Backend::Memory(db) => db.check_available().map(|()| db.delete_refresh_tokens(user_id)),
        }
    }

    /// Atomically swap every record of `user_id` for `new_record`, if the
    /// record `expected_id` still exists. Returns whether the swap happened.
    pub async fn replace_refresh_tokens(
        &self,
        user_id: &str,
        expected_id: &str,
        new_record: &RefreshTokenRecord,
    ) -> Result<bool, AppError> {
        match &self.backend {
            Backend::Firestore(db) => {
                db.replace_refresh_tokens(user_id, expected_id, new_record)
                    .await
            }
            Backend::Memory(db) => db
                .check_available()
                .map(|()| db.replace_refresh_tokens(user_id, expected_id, new_record)),
        }
    }
}
