use super::util::store_err;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::MySqlPool;

pub struct MySqlRoleRepo {
    pool: MySqlPool,
}

impl MySqlRoleRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlRoleRepo { pool }
    }
}

#[async_trait::async_trait]
impl RoleRepo for MySqlRoleRepo {
    async fn find_by_kind(&self, kind: RoleKind) -> Result<Option<Role>, AuthError> {
        let role_id: Option<RoleId> =
            sqlx::query_scalar("SELECT role_id FROM role WHERE name = ?")
                .bind(kind.name())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;

        Ok(role_id.map(|role_id| Role { role_id, kind }))
    }
}
