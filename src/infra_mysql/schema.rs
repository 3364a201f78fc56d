use crate::domain_model::RoleKind;
use sqlx::MySqlPool;

/// `username` uses a binary collation so uniqueness and lookups are case-sensitive.
const CREATE_ROLE: &str = r#"
CREATE TABLE IF NOT EXISTS role (
    role_id BIGINT NOT NULL AUTO_INCREMENT,
    name    VARCHAR(32) NOT NULL,
    PRIMARY KEY (role_id),
    UNIQUE KEY uk_role_name (name)
)
"#;

const CREATE_USER_ACCOUNT: &str = r#"
CREATE TABLE IF NOT EXISTS user_account (
    user_id       BINARY(16) NOT NULL,
    username      VARCHAR(64) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    email         VARCHAR(255) NOT NULL,
    created_at    DATETIME(6) NOT NULL,
    PRIMARY KEY (user_id),
    UNIQUE KEY uk_user_account_username (username)
)
"#;

const CREATE_USER_ROLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_role (
    user_id BINARY(16) NOT NULL,
    role_id BIGINT NOT NULL,
    PRIMARY KEY (user_id, role_id),
    CONSTRAINT fk_user_role_user FOREIGN KEY (user_id) REFERENCES user_account (user_id),
    CONSTRAINT fk_user_role_role FOREIGN KEY (role_id) REFERENCES role (role_id)
)
"#;

/// Create the tables if missing and seed one row per role variant.
pub async fn bootstrap_schema(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    for ddl in [CREATE_ROLE, CREATE_USER_ACCOUNT, CREATE_USER_ROLE] {
        sqlx::query(ddl).execute(pool).await?;
    }

    for kind in RoleKind::ALL {
        sqlx::query("INSERT IGNORE INTO role (name) VALUES (?)")
            .bind(kind.name())
            .execute(pool)
            .await?;
    }

    tracing::info!("mysql schema ready");
    Ok(())
}
