use crate::domain_model::RoleSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    pub fn new_v4() -> Self {
        UserId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted account. `password_hash` is a PHC string, never plaintext.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub roles: RoleSet,
    pub created_at: DateTime<Utc>,
}

/// An account ready to be inserted. The store assigns nothing; the id and
/// timestamp are fixed by the caller so the insert is a single statement.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub roles: RoleSet,
    pub created_at: DateTime<Utc>,
}

impl From<NewUser> for User {
    fn from(new_user: NewUser) -> Self {
        let NewUser {
            user_id,
            username,
            password_hash,
            email,
            roles,
            created_at,
        } = new_user;
        User {
            user_id,
            username,
            password_hash,
            email,
            roles,
            created_at,
        }
    }
}
