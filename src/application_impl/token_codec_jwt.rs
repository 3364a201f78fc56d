use crate::application_port::{AuthError, IssuedToken, TokenClaims, TokenCodec};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::fmt;

/// Key material for the configured algorithm. PEM keys must be PKCS#8
/// (private) and SPKI (public).
#[derive(Clone)]
pub enum SigningKey {
    Hs256 { secret: Vec<u8> },
    Rs256 { private_pem: Vec<u8>, public_pem: Vec<u8> },
    Es256 { private_pem: Vec<u8>, public_pem: Vec<u8> },
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SigningKey::Hs256 { .. } => "Hs256",
            SigningKey::Rs256 { .. } => "Rs256",
            SigningKey::Es256 { .. } => "Es256",
        };
        write!(f, "SigningKey::{name}(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub ttl: TimeDelta,
    pub signing_key: SigningKey,
}

/// Signs and verifies tokens. Keys are parsed once here and never change.
pub struct JwtCodec {
    issuer: String,
    audience: String,
    ttl: TimeDelta,
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCodec {
    pub fn try_new(cfg: JwtConfig) -> Result<Self, AuthError> {
        let key_err = |e: jsonwebtoken::errors::Error| {
            AuthError::InternalError(format!("invalid signing key: {e}"))
        };

        let (algorithm, encoding_key, decoding_key) = match &cfg.signing_key {
            SigningKey::Hs256 { secret } => {
                if secret.is_empty() {
                    return Err(AuthError::InternalError(
                        "HS256 secret must not be empty".to_string(),
                    ));
                }
                (
                    Algorithm::HS256,
                    EncodingKey::from_secret(secret),
                    DecodingKey::from_secret(secret),
                )
            }
            SigningKey::Rs256 {
                private_pem,
                public_pem,
            } => (
                Algorithm::RS256,
                EncodingKey::from_rsa_pem(private_pem).map_err(key_err)?,
                DecodingKey::from_rsa_pem(public_pem).map_err(key_err)?,
            ),
            SigningKey::Es256 {
                private_pem,
                public_pem,
            } => (
                Algorithm::ES256,
                EncodingKey::from_ec_pem(private_pem).map_err(key_err)?,
                DecodingKey::from_ec_pem(public_pem).map_err(key_err)?,
            ),
        };

        if cfg.ttl <= TimeDelta::zero() {
            return Err(AuthError::InternalError(
                "token ttl must be positive".to_string(),
            ));
        }
        if Utc::now().checked_add_signed(cfg.ttl).is_none() {
            return Err(AuthError::InternalError(
                "token ttl overflows the expiry timestamp".to_string(),
            ));
        }

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.set_audience(&[cfg.audience.clone()]);
        validation.set_issuer(&[cfg.issuer.clone()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        Ok(JwtCodec {
            issuer: cfg.issuer,
            audience: cfg.audience,
            ttl: cfg.ttl,
            algorithm,
            encoding_key,
            decoding_key,
            validation,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn encode_claims(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(e.to_string()))
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtCodec {
    async fn issue(&self, subject: &str, roles: &[String]) -> Result<IssuedToken, AuthError> {
        let issued_at = Utc::now();
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::InternalError("token expiry out of range".to_string()))?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            roles: roles.to_vec(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = self.encode_claims(&claims)?;
        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    async fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            },
        )?;
        Ok(data.claims)
    }
}
