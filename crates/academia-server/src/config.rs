use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use academia_api::state::RegistrationMode;

pub const DEFAULT_DEV_PASSWORD: &str = "Dev123!";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

/// Everything the server reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub profile_image_dir: PathBuf,
    pub settings_dir: PathBuf,
    pub registration: RegistrationMode,
    pub session_days: i64,
    pub max_upload_bytes: usize,
    pub dev_email: String,
    pub dev_password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let host = get("ACADEMIA_HOST", "0.0.0.0");
        let port: u16 = parse("ACADEMIA_PORT", &get("ACADEMIA_PORT", "3000"))?;
        let bind_address = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("ACADEMIA_HOST", e.to_string()))?;

        let session_days: i64 = parse("ACADEMIA_SESSION_DAYS", &get("ACADEMIA_SESSION_DAYS", "30"))?;
        if session_days < 1 {
            return Err(ConfigError::InvalidValue(
                "ACADEMIA_SESSION_DAYS",
                "must be at least 1".into(),
            ));
        }
        let max_upload_mb: usize = parse("ACADEMIA_MAX_UPLOAD_MB", &get("ACADEMIA_MAX_UPLOAD_MB", "200"))?;
        let max_upload_bytes = max_upload_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            ConfigError::InvalidValue("ACADEMIA_MAX_UPLOAD_MB", format!("'{}' is too large", max_upload_mb))
        })?;

        Ok(Self {
            bind_address,
            db_path: get("ACADEMIA_DB_PATH", "academia.db").into(),
            upload_dir: get("ACADEMIA_UPLOAD_DIR", "./uploads").into(),
            profile_image_dir: get("ACADEMIA_PROFILE_IMAGE_DIR", "./profile_images").into(),
            settings_dir: get("ACADEMIA_SETTINGS_DIR", "./settings").into(),
            registration: parse("ACADEMIA_REGISTRATION_MODE", &get("ACADEMIA_REGISTRATION_MODE", "approval"))?,
            session_days,
            max_upload_bytes,
            dev_email: get("ACADEMIA_DEV_EMAIL", "dev@edu.local").to_lowercase(),
            dev_password: get("ACADEMIA_DEV_PASSWORD", DEFAULT_DEV_PASSWORD),
        })
    }

    pub fn uses_default_dev_password(&self) -> bool {
        self.dev_password == DEFAULT_DEV_PASSWORD
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key, format!("'{}': {}", raw, e)))
}
