use crate::application_port::{AuthError, CredentialHasher};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Argon2id with the crate's default parameters. Digests are PHC strings,
/// so the salt and parameters travel with the hash.
pub struct Argon2PasswordHasher;

impl Argon2PasswordHasher {
    fn hash_blocking(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    fn verify_blocking(password: &str, password_hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!("verify error: {e}"))),
        }
    }
}

// Argon2 is deliberately slow; keep it off the async workers.
#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || Self::hash_blocking(&password))
            .await
            .map_err(|e| AuthError::InternalError(format!("hash task: {e}")))?
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let password_hash = password_hash.to_owned();
        tokio::task::spawn_blocking(move || Self::verify_blocking(&password, &password_hash))
            .await
            .map_err(|e| AuthError::InternalError(format!("verify task: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn verifies_correct_and_rejects_wrong_password() {
        let hasher = Argon2PasswordHasher;
        let digest = hasher.hash_password("secret1").await.unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(!digest.contains("secret1"));
        assert!(hasher.verify_password("secret1", &digest).await.unwrap());
        assert!(!hasher.verify_password("secret2", &digest).await.unwrap());
        assert!(!hasher.verify_password("", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_gets_a_fresh_salt() {
        let hasher = Argon2PasswordHasher;
        let a = hasher.hash_password("collide").await.unwrap();
        let b = hasher.hash_password("collide").await.unwrap();

        assert_ne!(a, b);
        assert!(hasher.verify_password("collide", &a).await.unwrap());
        assert!(hasher.verify_password("collide", &b).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_digest_is_an_error_not_a_mismatch() {
        let hasher = Argon2PasswordHasher;
        let err = hasher
            .verify_password("secret1", "not-a-phc-string")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InternalError(_)));
    }
}
