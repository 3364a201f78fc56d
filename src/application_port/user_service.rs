use crate::application_port::AuthError;
use crate::domain_model::{User, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Public view of an account; the password hash never leaves the service.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            user_id: user.user_id,
            username: user.username.clone(),
            email: user.email.clone(),
            roles: user.roles.names(),
            created_at: user.created_at,
        }
    }
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserSummary>, AuthError>;
}
