// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle: register, login, refresh rotation, logout, and
//! resolving the current user.
//!
//! A session chain is an access token (15 minutes) plus a refresh token
//! (7 days) whose hash is stored server-side. Each user has a single active
//! chain: login and rotation both revoke every other refresh record of the
//! user, so signing in elsewhere signs the previous browser out at its next
//! refresh.

use crate::db::Db;
use crate::error::AppError;
use crate::models::{PublicUser, User};
use crate::services::password::CredentialHasher;
use crate::services::session_store::SessionStore;
use crate::services::token::{Claims, IssuedToken, TokenCodec, TokenKind};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Access + refresh token issued together.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Result of a successful login, registration or refresh.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: PublicUser,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct SessionManager {
    db: Db,
    store: SessionStore,
    codec: Arc<TokenCodec>,
    hasher: CredentialHasher,
}

impl SessionManager {
    pub fn new(db: Db, codec: TokenCodec, hasher: CredentialHasher) -> Self {
        Self {
            store: SessionStore::new(db.clone(), hasher.clone()),
            db,
            codec: Arc::new(codec),
            hasher,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Create an account and start its first session.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AppError> {
        let email = normalize_email(email);

        if self.db.get_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            name: name.trim().to_string(),
            password_hash: self.hasher.hash_blocking(password).await?,
            created_at: Utc::now(),
        };
        // Duplicate emails racing past the check above are caught here.
        self.db.create_user(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");
        self.start_session(&user).await
    }

    /// Check credentials and start a new session, revoking any previous one.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let email = normalize_email(email);

        let Some(user) = self.db.get_user_by_email(&email).await? else {
            tracing::info!("Login failed: unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !self.hasher.verify_blocking(password, &user.password_hash).await {
            tracing::info!(user_id = %user.id, "Login failed: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let revoked = self.store.revoke_all(&user.id).await?;
        tracing::info!(user_id = %user.id, revoked, "User logged in");
        self.start_session(&user).await
    }

    /// Rotate a refresh token: the presented token is consumed and a new
    /// access + refresh pair is issued.
    ///
    /// Fails with `InvalidToken` if the token does not verify, matches no
    /// live record (already rotated, revoked or expired), belongs to a user
    /// that no longer exists, or loses a concurrent rotation.
    pub async fn refresh(&self, raw_refresh_token: &str) -> Result<AuthSession, AppError> {
        let claims = self
            .codec
            .verify(TokenKind::Refresh, raw_refresh_token)
            .ok_or(AppError::InvalidToken)?;

        let Some(matched) = self
            .store
            .find_matching_record(&claims.sub, raw_refresh_token)
            .await?
        else {
            tracing::warn!(user_id = %claims.sub, "Refresh token matches no live record");
            return Err(AppError::InvalidToken);
        };

        let Some(user) = self.db.get_user(&claims.sub).await? else {
            tracing::warn!(user_id = %claims.sub, "Refresh for missing user");
            self.store.revoke_all(&claims.sub).await?;
            return Err(AppError::InvalidToken);
        };

        let tokens = self.issue_pair(&user)?;
        let token_hash = self.store.hash_token(&tokens.refresh.token).await?;

        let rotated = self
            .store
            .rotate(
                &user.id,
                &matched.id,
                token_hash,
                tokens.refresh.claims.expires_at(),
            )
            .await?;

        if rotated.is_none() {
            tracing::warn!(user_id = %user.id, "Lost concurrent refresh rotation");
            return Err(AppError::InvalidToken);
        }

        tracing::info!(user_id = %user.id, "Refresh token rotated");
        Ok(AuthSession {
            user: PublicUser::from(&user),
            tokens,
        })
    }

    /// Revoke every refresh record of the user identified by either token.
    ///
    /// The access token is preferred; an expired one falls back to the
    /// refresh token. Returns the user whose sessions were revoked, if any.
    pub async fn logout(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Result<Option<String>, AppError> {
        let user_id = access_token
            .and_then(|t| self.codec.verify(TokenKind::Access, t))
            .or_else(|| refresh_token.and_then(|t| self.codec.verify(TokenKind::Refresh, t)))
            .map(|claims| claims.sub);

        let Some(user_id) = user_id else {
            return Ok(None);
        };

        let revoked = self.store.revoke_all(&user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "User logged out");
        Ok(Some(user_id))
    }

    /// Claims of a valid access token.
    pub fn verify_access(&self, access_token: &str) -> Option<Claims> {
        self.codec.verify(TokenKind::Access, access_token)
    }

    /// Resolve the user behind an access token. Fails closed: an invalid
    /// token or a deleted user both yield `None`.
    pub async fn current_user(&self, access_token: &str) -> Result<Option<PublicUser>, AppError> {
        match self.verify_access(access_token) {
            Some(claims) => self.user_by_id(&claims.sub).await,
            None => Ok(None),
        }
    }

    /// Load a user by id, for callers holding already-verified claims.
    pub async fn user_by_id(&self, user_id: &str) -> Result<Option<PublicUser>, AppError> {
        Ok(self
            .db
            .get_user(user_id)
            .await?
            .as_ref()
            .map(PublicUser::from))
    }

    fn issue_pair(&self, user: &User) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access: self.codec.sign(TokenKind::Access, &user.id, &user.email)?,
            refresh: self.codec.sign(TokenKind::Refresh, &user.id, &user.email)?,
        })
    }

    async fn start_session(&self, user: &User) -> Result<AuthSession, AppError> {
        let tokens = self.issue_pair(user)?;
        let token_hash = self.store.hash_token(&tokens.refresh.token).await?;
        self.store
            .create_refresh_record(&user.id, token_hash, tokens.refresh.claims.expires_at())
            .await?;

        Ok(AuthSession {
            user: PublicUser::from(user),
            tokens,
        })
    }
}

/// Emails are compared trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
