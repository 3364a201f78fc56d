use crate::application_port::{AuthError, UserService, UserSummary};
use crate::domain_port::UserRepo;
use std::sync::Arc;

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
}

impl RealUserService {
    pub fn new(user_repo: Arc<dyn UserRepo>) -> RealUserService {
        RealUserService { user_repo }
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn list_users(&self) -> Result<Vec<UserSummary>, AuthError> {
        let users = self.user_repo.find_all().await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }
}
