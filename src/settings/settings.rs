use anyhow::{Result, anyhow, bail};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub store: Store,
    pub jwt: Jwt,
    #[serde(default)]
    pub auth: Auth,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    /// TLS is enabled when both paths are set.
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory" or "mysql"
    pub dsn: Option<String>,
    #[serde(default = "default_true")]
    pub bootstrap_schema: bool,
}

#[derive(Deserialize)]
pub struct Jwt {
    pub algorithm: String, // "HS256", "RS256" or "ES256"
    pub issuer: String,
    pub audience: String,
    pub ttl_secs: u64,
    /// Inline HS256 secret; `secret_env` wins when that variable is set.
    pub secret: Option<String>,
    pub secret_env: Option<String>,
    pub private_key_path: Option<String>,
    pub public_key_path: Option<String>,
}

impl fmt::Debug for Jwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwt")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_secs", &self.ttl_secs)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("secret_env", &self.secret_env)
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Auth {
    /// When false, `register-admin` requires a bearer token holding ROLE_ADMIN.
    #[serde(default)]
    pub open_admin_registration: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "WARDEN";

/// Longest accepted token lifetime: one year.
const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);
    build_settings(Config::builder().add_source(File::with_name(path)))
}

fn build_settings(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    fn validate(&self) -> Result<()> {
        match self.store.backend.as_str() {
            "memory" => {}
            "mysql" if self.store.dsn.is_none() => bail!("store.dsn is required for mysql"),
            "mysql" => {}
            other => bail!("unknown store backend: {other}"),
        }

        match self.jwt.algorithm.as_str() {
            "HS256" => {
                if self.jwt.secret.is_none() && self.jwt.secret_env.is_none() {
                    bail!("HS256 needs jwt.secret or jwt.secret_env");
                }
            }
            "RS256" | "ES256" => {
                if self.jwt.private_key_path.is_none() || self.jwt.public_key_path.is_none() {
                    bail!(
                        "{} needs jwt.private_key_path and jwt.public_key_path",
                        self.jwt.algorithm
                    );
                }
            }
            other => bail!("unsupported jwt algorithm: {other}"),
        }

        if self.jwt.ttl_secs == 0 {
            bail!("jwt.ttl_secs must be positive");
        }
        if self.jwt.ttl_secs > MAX_TTL_SECS {
            bail!("jwt.ttl_secs must not exceed {MAX_TTL_SECS}");
        }

        if self.http.cert_path.is_some() != self.http.key_path.is_some() {
            bail!("http.cert_path and http.key_path must be set together");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const BASE: &str = r#"
[http]
address = "127.0.0.1:8080"

[log]
filter = "info"

[store]
backend = "memory"

[jwt]
algorithm = "HS256"
issuer = "warden"
audience = "warden-clients"
ttl_secs = 3600
secret = "dev-only"
"#;

    fn parse(toml: &str) -> Result<Settings> {
        build_settings(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn parses_minimal_settings_with_defaults() {
        let settings = parse(BASE).unwrap();
        assert_eq!(settings.store.backend, "memory");
        assert!(settings.store.bootstrap_schema);
        assert!(!settings.auth.open_admin_registration);
        assert!(settings.http.cert_path.is_none());
        assert_eq!(settings.jwt.ttl_secs, 3600);
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let settings = parse(BASE).unwrap();
        let printed = format!("{settings:?}");
        assert!(!printed.contains("dev-only"));
    }

    #[test]
    fn rejects_unknown_backend_and_algorithm() {
        assert!(parse(&BASE.replace("\"memory\"", "\"postgres\"")).is_err());
        assert!(parse(&BASE.replace("\"HS256\"", "\"none\"")).is_err());
    }

    #[test]
    fn mysql_requires_a_dsn() {
        assert!(parse(&BASE.replace("\"memory\"", "\"mysql\"")).is_err());
    }

    #[test]
    fn asymmetric_algorithms_require_key_paths() {
        assert!(parse(&BASE.replace("\"HS256\"", "\"RS256\"")).is_err());
    }

    #[test]
    fn ttl_is_bounded() {
        assert!(parse(&BASE.replace("ttl_secs = 3600", "ttl_secs = 0")).is_err());
        assert!(parse(&BASE.replace("ttl_secs = 3600", "ttl_secs = 9000000000000")).is_err());
        assert!(parse(&BASE.replace("ttl_secs = 3600", "ttl_secs = 31536000")).is_ok());
    }

    #[test]
    fn half_configured_tls_is_rejected() {
        let toml = BASE.replace(
            "address = \"127.0.0.1:8080\"",
            "address = \"127.0.0.1:8080\"\ncert_path = \"cert.pem\"",
        );
        assert!(parse(&toml).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(parse_settings(Some("does/not/exist.toml")).is_err());
    }
}
