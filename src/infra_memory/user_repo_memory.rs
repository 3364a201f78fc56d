use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Keyed by username; the entry API makes check-and-insert atomic per key.
pub struct MemoryUserRepo {
    users: DashMap<String, User>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        MemoryUserRepo {
            users: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for MemoryUserRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn exists_by_username(&self, username: &str) -> Result<bool, AuthError> {
        Ok(self.users.contains_key(username))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        Ok(self.users.get(username).map(|u| u.value().clone()))
    }

    async fn save(&self, user: NewUser) -> Result<User, AuthError> {
        match self.users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(AuthError::DuplicateUsername),
            Entry::Vacant(slot) => {
                let user = User::from(user);
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    async fn find_all(&self) -> Result<Vec<User>, AuthError> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_user(username: &str, hash: &str) -> NewUser {
        NewUser {
            user_id: UserId::new_v4(),
            username: username.to_string(),
            password_hash: hash.to_string(),
            email: format!("{username}@example.com"),
            roles: RoleSet::single(Role {
                role_id: RoleId(1),
                kind: RoleKind::User,
            }),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_then_find() {
        let repo = MemoryUserRepo::new();
        let saved = repo.save(new_user("alice", "h1")).await.unwrap();

        assert!(repo.exists_by_username("alice").await.unwrap());
        let found = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.user_id, saved.user_id);
        assert_eq!(found.password_hash, "h1");
    }

    #[tokio::test]
    async fn lookup_is_case_sensitive() {
        let repo = MemoryUserRepo::new();
        repo.save(new_user("alice", "h1")).await.unwrap();

        assert!(!repo.exists_by_username("Alice").await.unwrap());
        assert!(repo.find_by_username("ALICE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_save_conflicts_without_overwriting() {
        let repo = MemoryUserRepo::new();
        assert!(repo.is_empty());
        repo.save(new_user("alice", "first")).await.unwrap();

        let err = repo.save(new_user("alice", "second")).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername));
        assert_eq!(repo.len(), 1);
        let kept = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(kept.password_hash, "first");
    }

    #[tokio::test]
    async fn concurrent_saves_of_one_username_admit_exactly_one() {
        let repo = std::sync::Arc::new(MemoryUserRepo::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.save(new_user("racer", &format!("h{i}"))).await
            }));
        }

        let mut won = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => won += 1,
                Err(AuthError::DuplicateUsername) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(won, 1);
        assert_eq!(repo.len(), 1);
    }
}
