// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile + password hash)
//! - User emails (uniqueness index keyed by lowercased email)
//! - Refresh tokens (hashed, one document per issued token)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{RefreshTokenRecord, User};
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;
use serde::{Deserialize, Serialize};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Document in `user_emails`, keyed by the lowercased email.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmailIndex {
    user_id: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user by lowercased email, via the email index.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let index: Option<EmailIndex> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::USER_EMAILS)
            .obj()
            .one(email)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match index {
            Some(index) => self.get_user(&index.user_id).await,
            None => Ok(None),
        }
    }

    /// Create a user. The email index and user documents are written in one
    /// transaction, each with a must-not-exist precondition, so a taken email
    /// fails the whole commit and a failed commit claims nothing.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let index = EmailIndex {
            user_id: user.id.clone(),
        };

        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        self.client
            .fluent()
            .update()
            .in_col(collections::USER_EMAILS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&user.email)
            .object(&index)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add email index to transaction: {}", e))
            })?;

        self.client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        match transaction.commit().await {
            Ok(_) => Ok(()),
            Err(e) if is_write_conflict(&e) => Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            )),
            Err(e) => Err(AppError::Database(format!("Transaction commit failed: {}", e))),
        }
    }

    // ─── Refresh Token Operations ────────────────────────────────

    /// Store a refresh token record.
    pub async fn set_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::REFRESH_TOKENS)
            .document_id(&record.id)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// All refresh token records for a user, expired or not.
    pub async fn get_refresh_tokens(
        &self,
        user_id: &str,
    ) -> Result<Vec<RefreshTokenRecord>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::REFRESH_TOKENS)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete every refresh token record for a user.
    pub async fn delete_refresh_tokens(&self, user_id: &str) -> Result<usize, AppError> {
        let records = self.get_refresh_tokens(user_id).await?;
        let count = records.len();
        self.batch_delete(&records, collections::REFRESH_TOKENS, |r| r.id.clone())
            .await?;
        Ok(count)
    }

    /// Replace all of a user's records with `new_record` in one transaction.
    ///
    /// The delete of `expected_id` carries a must-exist precondition, so of
    /// two rotations racing on the same record only one commit succeeds; the
    /// other returns `Ok(false)`.
    pub async fn replace_refresh_tokens(
        &self,
        user_id: &str,
        expected_id: &str,
        new_record: &RefreshTokenRecord,
    ) -> Result<bool, AppError> {
        let records = self.get_refresh_tokens(user_id).await?;
        if !records.iter().any(|r| r.id == expected_id) {
            return Ok(false);
        }

        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for record in &records {
            let delete = self.client.fluent().delete().from(collections::REFRESH_TOKENS);
            let delete = if record.id == expected_id {
                delete.precondition(FirestoreWritePrecondition::Exists(true))
            } else {
                delete
            };
            delete
                .document_id(&record.id)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add deletion to transaction: {}", e))
                })?;
        }

        self.client
            .fluent()
            .update()
            .in_col(collections::REFRESH_TOKENS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&new_record.id)
            .object(new_record)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add record to transaction: {}", e))
            })?;

        match transaction.commit().await {
            Ok(_) => Ok(true),
            Err(e) if is_write_conflict(&e) => {
                tracing::debug!(user_id, error = %e, "Refresh rotation lost a race");
                Ok(false)
            }
            Err(e) => Err(AppError::Database(format!("Transaction commit failed: {}", e))),
        }
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = self
                .client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                self.client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Whether a commit failed because a write precondition did not hold or the
/// transaction was aborted by a concurrent writer.
fn is_write_conflict(err: &FirestoreError) -> bool {
    match err {
        FirestoreError::DataConflictError(_) | FirestoreError::DataNotFoundError(_) => true,
        FirestoreError::DatabaseError(e) => {
            matches!(e.public.code.as_str(), "FailedPrecondition" | "Aborted")
        }
        _ => false,
    }
}
