use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

const DUMMY_PASSWORD: &str = "warden-unknown-user";

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    role_repo: Arc<dyn RoleRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    // Digest verified against when the username is unknown, so both login
    // failures pay for one verify.
    dummy_digest: OnceCell<String>,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        role_repo: Arc<dyn RoleRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
    ) -> Self {
        Self {
            user_repo,
            role_repo,
            credential_hasher,
            token_codec,
            dummy_digest: OnceCell::new(),
        }
    }

    async fn verify_against_dummy(&self, password: &str) -> Result<(), AuthError> {
        let digest = self
            .dummy_digest
            .get_or_try_init(|| self.credential_hasher.hash_password(DUMMY_PASSWORD))
            .await?;
        self.credential_hasher
            .verify_password(password, digest)
            .await?;
        Ok(())
    }

    fn validate_register(request: &RegisterInput) -> Result<(), AuthError> {
        if request.username.is_empty() {
            return Err(AuthError::InvalidInput("username must not be empty".to_string()));
        }
        if request.password.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    #[tracing::instrument(skip_all, fields(username = %request.username, role = %role))]
    async fn register(&self, request: RegisterInput, role: RoleKind) -> Result<UserId, AuthError> {
        Self::validate_register(&request)?;
        let RegisterInput {
            username,
            password,
            email,
        } = request;

        // Fast path only; `save` is the real uniqueness guard.
        if self.user_repo.exists_by_username(&username).await? {
            return Err(AuthError::DuplicateUsername);
        }

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        drop(password);

        let role = match self.role_repo.find_by_kind(role).await? {
            Some(r) => r,
            None => {
                error!("role record missing from role store; seed it before registering");
                return Err(AuthError::RoleNotConfigured(role));
            }
        };

        let user = self
            .user_repo
            .save(NewUser {
                user_id: UserId::new_v4(),
                username,
                password_hash,
                email,
                roles: RoleSet::single(role),
                created_at: Utc::now(),
            })
            .await?;

        info!(user_id = %user.user_id, "user registered");
        Ok(user.user_id)
    }

    #[tracing::instrument(skip_all, fields(username = %request.username))]
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { username, password } = request;

        let Some(user) = self.user_repo.find_by_username(&username).await? else {
            self.verify_against_dummy(&password).await?;
            return Err(AuthError::UserNotFound);
        };

        let ok = self
            .credential_hasher
            .verify_password(&password, &user.password_hash)
            .await?;
        if !ok {
            warn!("password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let roles = user.roles.names();
        let issued = self.token_codec.issue(&user.username, &roles).await?;

        info!(expires_at = %issued.expires_at, "token issued");
        Ok(LoginResult {
            token: issued.token,
            username: user.username,
            roles,
        })
    }
}
