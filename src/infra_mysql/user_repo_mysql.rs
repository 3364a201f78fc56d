use super::util::{is_dup_key, store_err};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

const SELECT_USERS_WITH_ROLES: &str = r#"
SELECT u.user_id, u.username, u.password_hash, u.email, u.created_at,
       r.role_id, r.name AS role_name
FROM user_account u
JOIN user_role ur ON ur.user_id = u.user_id
JOIN role r ON r.role_id = ur.role_id
"#;

#[derive(sqlx::FromRow)]
struct UserRoleRow {
    user_id: UserId,
    username: String,
    password_hash: String,
    email: String,
    created_at: DateTime<Utc>,
    role_id: RoleId,
    role_name: String,
}

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    /// Fold joined rows into users. Rows of one user must be adjacent.
    fn collect_users(rows: Vec<UserRoleRow>) -> Result<Vec<User>, AuthError> {
        let mut grouped: Vec<(UserRoleRow, Vec<Role>)> = Vec::new();
        for row in rows {
            let kind = row
                .role_name
                .parse::<RoleKind>()
                .map_err(|e| AuthError::Store(e.to_string()))?;
            let role = Role {
                role_id: row.role_id,
                kind,
            };
            let same_user = grouped
                .last()
                .is_some_and(|(head, _)| head.user_id == row.user_id);
            match grouped.last_mut() {
                Some((_, roles)) if same_user => roles.push(role),
                _ => grouped.push((row, vec![role])),
            }
        }

        grouped
            .into_iter()
            .map(|(head, roles)| {
                let roles = RoleSet::from_roles(roles).ok_or_else(|| {
                    AuthError::Store(format!("user {} has no roles", head.user_id))
                })?;
                Ok(User {
                    user_id: head.user_id,
                    username: head.username,
                    password_hash: head.password_hash,
                    email: head.email,
                    roles,
                    created_at: head.created_at,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn exists_by_username(&self, username: &str) -> Result<bool, AuthError> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM user_account WHERE username = ?"#)
                .bind(username)
                .fetch_one(&self.pool)
                .await
                .map_err(store_err)?;

        Ok(count > 0)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let sql = format!("{SELECT_USERS_WITH_ROLES} WHERE u.username = ?");
        let rows = sqlx::query_as::<_, UserRoleRow>(&sql)
            .bind(username)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(Self::collect_users(rows)?.into_iter().next())
    }

    async fn save(&self, user: NewUser) -> Result<User, AuthError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        sqlx::query(
            r#"
INSERT INTO user_account (user_id, username, password_hash, email, created_at)
VALUES (?, ?, ?, ?, ?)
"#,
        )
        .bind(user.user_id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                AuthError::DuplicateUsername
            } else {
                store_err(e)
            }
        })?;

        for role in user.roles.iter() {
            sqlx::query("INSERT INTO user_role (user_id, role_id) VALUES (?, ?)")
                .bind(user.user_id)
                .bind(role.role_id)
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)?;

        Ok(User::from(user))
    }

    async fn find_all(&self) -> Result<Vec<User>, AuthError> {
        let sql = format!("{SELECT_USERS_WITH_ROLES} ORDER BY u.created_at, u.user_id");
        let rows = sqlx::query_as::<_, UserRoleRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        Self::collect_users(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user_id: UserId, username: &str, role_id: i64, role_name: &str) -> UserRoleRow {
        UserRoleRow {
            user_id,
            username: username.to_string(),
            password_hash: "$argon2id$fake".to_string(),
            email: format!("{username}@example.com"),
            created_at: Utc::now(),
            role_id: RoleId(role_id),
            role_name: role_name.to_string(),
        }
    }

    #[test]
    fn adjacent_rows_fold_into_one_user() {
        let a = UserId::new_v4();
        let b = UserId::new_v4();
        let users = MySqlUserRepo::collect_users(vec![
            row(a, "alice", 1, "ROLE_USER"),
            row(a, "alice", 2, "ROLE_ADMIN"),
            row(b, "bob", 1, "ROLE_USER"),
        ])
        .unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "alice");
        assert_eq!(users[0].roles.names(), vec!["ROLE_ADMIN", "ROLE_USER"]);
        assert_eq!(users[1].username, "bob");
        assert_eq!(users[1].roles.names(), vec!["ROLE_USER"]);
    }

    #[test]
    fn unknown_role_name_is_a_store_error() {
        let err = MySqlUserRepo::collect_users(vec![row(UserId::new_v4(), "eve", 9, "ROLE_ROOT")])
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
    }
}
