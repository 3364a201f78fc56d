use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::settings::{Jwt, Settings};
use anyhow::{Context, anyhow, bail};
use chrono::TimeDelta;
use sqlx::{MySql, Pool};
use std::sync::Arc;

/// Every service the HTTP layer needs, wired once at startup.
pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pub token_codec: Arc<dyn TokenCodec>,
    pub open_admin_registration: bool,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let signing_key = load_signing_key(&settings.jwt)?;
        let ttl = TimeDelta::try_seconds(settings.jwt.ttl_secs as i64)
            .ok_or_else(|| anyhow!("jwt.ttl_secs out of range"))?;
        let jwt_codec = JwtCodec::try_new(JwtConfig {
            issuer: settings.jwt.issuer.clone(),
            audience: settings.jwt.audience.clone(),
            ttl,
            signing_key,
        })?;
        info!(algorithm = ?jwt_codec.algorithm(), "token signing key loaded");
        let token_codec: Arc<dyn TokenCodec> = Arc::new(jwt_codec);

        let (user_repo, role_repo, pool) =
            match settings.store.backend.as_str() {
                "memory" => {
                    warn!("using in-memory stores; accounts are lost on restart");
                    let users: Arc<dyn UserRepo> = Arc::new(MemoryUserRepo::new());
                    let roles: Arc<dyn RoleRepo> = Arc::new(MemoryRoleRepo::seeded());
                    (users, roles, None)
                }
                "mysql" => {
                    let dsn = settings
                        .store
                        .dsn
                        .as_deref()
                        .ok_or_else(|| anyhow!("store.dsn is required for mysql"))?;
                    let pool = Pool::<MySql>::connect(dsn).await?;
                    if settings.store.bootstrap_schema {
                        bootstrap_schema(&pool).await?;
                    }
                    let users: Arc<dyn UserRepo> = Arc::new(MySqlUserRepo::new(pool.clone()));
                    let roles: Arc<dyn RoleRepo> = Arc::new(MySqlRoleRepo::new(pool.clone()));
                    (users, roles, Some(pool))
                }
                other => return Err(anyhow!("Unknown store backend: {}", other)),
            };

        let mut server = Self::from_parts(
            user_repo,
            role_repo,
            token_codec,
            settings.auth.open_admin_registration,
        );
        server.pool = pool;

        info!("server started");
        Ok(server)
    }

    pub fn from_parts(
        user_repo: Arc<dyn UserRepo>,
        role_repo: Arc<dyn RoleRepo>,
        token_codec: Arc<dyn TokenCodec>,
        open_admin_registration: bool,
    ) -> Self {
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);
        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo.clone(),
            role_repo,
            credential_hasher,
            token_codec.clone(),
        ));
        let user_service: Arc<dyn UserService> = Arc::new(RealUserService::new(user_repo));

        Server {
            auth_service,
            user_service,
            token_codec,
            open_admin_registration,
            pool: None,
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");
        if let Some(pool) = &self.pool {
            pool.close().await;
            info!("mysql pool closed");
        }
    }
}

fn load_signing_key(jwt: &Jwt) -> anyhow::Result<SigningKey> {
    let read_pem = |path: &Option<String>, what: &str| -> anyhow::Result<Vec<u8>> {
        let path = path
            .as_deref()
            .ok_or_else(|| anyhow!("jwt.{what} is required for {}", jwt.algorithm))?;
        std::fs::read(path).with_context(|| format!("reading jwt.{what} {path:?}"))
    };

    match jwt.algorithm.as_str() {
        "HS256" => {
            let from_env = jwt
                .secret_env
                .as_deref()
                .and_then(|name| std::env::var(name).ok());
            let secret = match (from_env, &jwt.secret) {
                (Some(secret), _) => secret,
                (None, Some(secret)) => {
                    warn!("using inline jwt.secret from settings");
                    secret.clone()
                }
                (None, None) => bail!("no HS256 secret: set jwt.secret_env or jwt.secret"),
            };
            Ok(SigningKey::Hs256 {
                secret: secret.into_bytes(),
            })
        }
        "RS256" => Ok(SigningKey::Rs256 {
            private_pem: read_pem(&jwt.private_key_path, "private_key_path")?,
            public_pem: read_pem(&jwt.public_key_path, "public_key_path")?,
        }),
        "ES256" => Ok(SigningKey::Es256 {
            private_pem: read_pem(&jwt.private_key_path, "private_key_path")?,
            public_pem: read_pem(&jwt.public_key_path, "public_key_path")?,
        }),
        other => bail!("unsupported jwt algorithm: {other}"),
    }
}
