use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait RoleRepo: Send + Sync {
    /// Look up the stored record for a role variant. Records are seeded at
    /// bootstrap and never created here.
    async fn find_by_kind(&self, kind: RoleKind) -> Result<Option<Role>, AuthError>;
}
