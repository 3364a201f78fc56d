use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Case-sensitive exact match.
    async fn exists_by_username(&self, username: &str) -> Result<bool, AuthError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;

    /// Insert a new account. Must fail with `AuthError::DuplicateUsername` when the
    /// username is already present, and must never overwrite the existing record.
    async fn save(&self, user: NewUser) -> Result<User, AuthError>;

    async fn find_all(&self) -> Result<Vec<User>, AuthError>;
}
