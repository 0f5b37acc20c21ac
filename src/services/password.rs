// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Argon2id hashing for passwords and refresh tokens.
//!
//! Hashes are self-describing PHC strings, so verification always uses the
//! parameters a hash was created with, even after the work factor changes.

use crate::error::AppError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Salted one-way hashing with a fixed work factor.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// Create a hasher with the given memory cost (KiB) and iteration count.
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, AppError> {
        let params = Params::new(memory_kib, iterations, 1, None).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Invalid Argon2 parameters: {}", e))
        })?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a secret with a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing failed: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Check a secret against a stored hash.
    ///
    /// Fails closed: a malformed hash or any verifier error yields `false`.
    pub fn verify(&self, secret: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored hash is malformed");
                return false;
            }
        };

        match self.argon2().verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Hash verification failed");
                false
            }
        }
    }

    /// [`hash`](Self::hash) on the blocking pool; Argon2 is deliberately slow.
    pub async fn hash_blocking(&self, secret: &str) -> Result<String, AppError> {
        let hasher = self.clone();
        let secret = secret.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))?
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_blocking(&self, secret: &str, hash: &str) -> bool {
        let hasher = self.clone();
        let secret = secret.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&secret, &hash))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(1024, 1).unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = hasher();
        let hash = hasher.hash("Passw0rd").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("Passw0rd", &hash));
    }

    #[test]
    fn test_single_character_mutations_fail() {
        let hasher = hasher();
        let password = "Passw0rd";
        let hash = hasher.hash(password).unwrap();

        for (i, c) in password.char_indices() {
            let replacement = if c == 'x' { 'y' } else { 'x' };
            let mut mutated = password.to_string();
            mutated.replace_range(i..i + c.len_utf8(), &replacement.to_string());
            assert!(!hasher.verify(&mutated, &hash), "mutation {mutated} verified");
        }
        assert!(!hasher.verify("Passw0r", &hash));
        assert!(!hasher.verify("Passw0rdd", &hash));
    }

    #[test]
    fn test_salted_hashes_differ() {
        let hasher = hasher();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_malformed_hash_fails_closed() {
        let hasher = hasher();
        assert!(!hasher.verify("Passw0rd", "not-a-hash"));
        assert!(!hasher.verify("Passw0rd", ""));
        assert!(!hasher.verify("Passw0rd", "$argon2id$v=19$m=1024,t=1,p=1$garbage"));
    }

    #[test]
    fn test_verify_uses_parameters_embedded_in_hash() {
        let old = CredentialHasher::new(2048, 2).unwrap();
        let hash = old.hash("Passw0rd").unwrap();
        assert!(hasher().verify("Passw0rd", &hash));
    }

    #[tokio::test]
    async fn test_blocking_wrappers() {
        let hasher = hasher();
        let hash = hasher.hash_blocking("Passw0rd").await.unwrap();
        assert!(hasher.verify_blocking("Passw0rd", &hash).await);
        assert!(!hasher.verify_blocking("passw0rd", &hash).await);
    }
}
