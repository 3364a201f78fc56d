use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;

pub struct MemoryRoleRepo {
    roles: DashMap<RoleKind, Role>,
}

impl MemoryRoleRepo {
    pub fn empty() -> Self {
        MemoryRoleRepo {
            roles: DashMap::new(),
        }
    }

    /// One record per variant, ids assigned in declaration order starting at 1.
    pub fn seeded() -> Self {
        let repo = Self::empty();
        for (i, kind) in RoleKind::ALL.into_iter().enumerate() {
            repo.insert(Role {
                role_id: RoleId(i as i64 + 1),
                kind,
            });
        }
        repo
    }

    pub fn insert(&self, role: Role) {
        self.roles.insert(role.kind, role);
    }
}

#[async_trait::async_trait]
impl RoleRepo for MemoryRoleRepo {
    async fn find_by_kind(&self, kind: RoleKind) -> Result<Option<Role>, AuthError> {
        Ok(self.roles.get(&kind).map(|r| *r.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_repo_resolves_every_variant() {
        let repo = MemoryRoleRepo::seeded();
        let user = repo.find_by_kind(RoleKind::User).await.unwrap().unwrap();
        let admin = repo.find_by_kind(RoleKind::Admin).await.unwrap().unwrap();

        assert_eq!(user.kind, RoleKind::User);
        assert_eq!(admin.kind, RoleKind::Admin);
        assert_ne!(user.role_id, admin.role_id);
    }

    #[tokio::test]
    async fn empty_repo_finds_nothing() {
        let repo = MemoryRoleRepo::empty();
        assert!(repo.find_by_kind(RoleKind::Admin).await.unwrap().is_none());
    }
}
