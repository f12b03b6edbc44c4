use std::{fmt, net::SocketAddr, path::PathBuf, str::FromStr};

use jsonwebtoken::Algorithm;

/// Sub-directory of the static root that holds uploaded item photos.
pub const PHOTO_SUBDIR: &str = "item_photos";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingRequired(&'static str),

    #[error("invalid value for {0}")]
    InvalidValue(&'static str),
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl_minutes: i64,
}

// Keeps the signing secret out of logs.
impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub static_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingRequired(key))
        };

        let secret = required("SECRET_KEY")?;
        let algorithm = parse_algorithm(&required("ALGORITHM")?)?;
        let ttl_minutes = required("ACCESS_TOKEN_EXPIRE_MINUTES")?
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|m| *m > 0)
            .ok_or(ConfigError::InvalidValue("ACCESS_TOKEN_EXPIRE_MINUTES"))?;

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://inventory.db".into());
        let static_dir = PathBuf::from(lookup("STATIC_DIR").unwrap_or_else(|| "static".into()));

        let bind_addr = format!(
            "{}:{}",
            lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            lookup("APP_PORT").unwrap_or_else(|| "8080".into())
        )
        .parse()
        .map_err(|_| ConfigError::InvalidValue("APP_HOST/APP_PORT"))?;

        Ok(Self {
            database_url,
            static_dir,
            bind_addr,
            jwt: JwtConfig {
                secret,
                algorithm,
                ttl_minutes,
            },
        })
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.static_dir.join(PHOTO_SUBDIR)
    }
}

/// Only the shared-secret HMAC family can be driven by `SECRET_KEY`.
fn parse_algorithm(raw: &str) -> Result<Algorithm, ConfigError> {
    match Algorithm::from_str(raw.trim()) {
        Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
        _ => Err(ConfigError::InvalidValue("ALGORITHM")),
    }
}
