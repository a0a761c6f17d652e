//! Argon2id password hashing off the async runtime.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use std::sync::Arc;

use tokio::sync::OnceCell;

use storyhub_core::error::AppError;

/// Password the decoy hash is derived from. Never matches a real account.
const DECOY_PASSWORD: &str = "storyhub-decoy-credential";

/// Hashes and verifies passwords with Argon2id.
///
/// Both operations are CPU-bound and run on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher {
    decoy: Arc<OnceCell<String>>,
}

impl PasswordHasher {
    /// Creates a new password hasher instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spend one verification on a throwaway hash so a lookup miss costs
    /// as much as a wrong password.
    pub async fn verify_decoy(&self, password: &str) -> Result<(), AppError> {
        let hash = self
            .decoy
            .get_or_try_init(|| self.hash(DECOY_PASSWORD))
            .await?;
        self.verify(password, hash).await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn has_decoy(&self) -> bool {
        self.decoy.initialized()
    }

    /// Hash `password` with a fresh random salt.
    pub async fn hash(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hash_blocking(&password))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
    }

    /// Verify `password` against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch; errors only for unreadable hashes.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || verify_blocking(&password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))?
    }
}

fn hash_blocking(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
}

fn verify_blocking(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("Invalid password hash format: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::internal(format!("Password verification failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("correct horse").await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("correct horse", &hash).await.unwrap());
        assert!(!hasher.verify("wrong horse", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_decoy_is_built_once() {
        let hasher = PasswordHasher::new();
        assert!(!hasher.has_decoy());
        hasher.verify_decoy("anything").await.unwrap();
        assert!(hasher.has_decoy());

        let shared = hasher.clone();
        shared.verify_decoy("other").await.unwrap();
        assert_eq!(shared.decoy.get(), hasher.decoy.get());
    }

    #[tokio::test]
    async fn test_garbage_hash_is_error() {
        let hasher = PasswordHasher::new();
        assert!(hasher.verify("pw", "not-a-hash").await.is_err());
    }
}
