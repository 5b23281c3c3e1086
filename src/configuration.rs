use config::ConfigError;
use jsonwebtoken::Algorithm;

use crate::auth::is_hmac;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
    pub session_store: SessionStoreSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Mount `POST /auth/login`, which issues a pair for any posted user id
    pub expose_login: bool,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Token signing and lifetime settings
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub secret: String,
    pub access_token_ttl: i64,  // seconds (900 = 15 minutes)
    pub refresh_token_ttl: i64, // seconds (604800 = 7 days)
    pub algorithm: Algorithm,
}

/// Longest lifetime accepted for either token class (365 days)
pub const MAX_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

fn bounded_ttl(seconds: i64) -> Option<chrono::Duration> {
    if (1..=MAX_TOKEN_TTL_SECONDS).contains(&seconds) {
        chrono::Duration::try_seconds(seconds)
    } else {
        None
    }
}

impl AuthSettings {
    /// Access token lifetime, `None` unless within `1..=MAX_TOKEN_TTL_SECONDS`
    pub fn access_ttl(&self) -> Option<chrono::Duration> {
        bounded_ttl(self.access_token_ttl)
    }

    /// Refresh token lifetime, `None` unless within `1..=MAX_TOKEN_TTL_SECONDS`
    pub fn refresh_ttl(&self) -> Option<chrono::Duration> {
        bounded_ttl(self.refresh_token_ttl)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.secret must not be empty".into()));
        }
        if self.access_ttl().is_none() || self.refresh_ttl().is_none() {
            return Err(ConfigError::Message(format!(
                "token TTLs must be between 1 and {} seconds",
                MAX_TOKEN_TTL_SECONDS
            )));
        }
        if !is_hmac(self.algorithm) {
            return Err(ConfigError::Message(format!(
                "auth.algorithm must be HS256, HS384 or HS512, got {:?}",
                self.algorithm
            )));
        }
        Ok(())
    }
}

// The secret never reaches the logs.
impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct SessionStoreSettings {
    pub backend: StoreBackend,
    pub redis_url: String,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct TelemetrySettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    pub json: bool,
}

/// Load settings from `configuration.{yaml,toml,json}` and `APP_*` variables
/// (e.g. `APP_AUTH__SECRET`), on top of built-in defaults
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080i64)?
        .set_default("application.expose_login", false)?
        .set_default("auth.secret", "")?
        .set_default("auth.access_token_ttl", 15i64 * 60)?
        .set_default("auth.refresh_token_ttl", 7i64 * 24 * 60 * 60)?
        .set_default("auth.algorithm", "HS256")?
        .set_default("session_store.backend", "redis")?
        .set_default("session_store.redis_url", "redis://127.0.0.1:6379")?
        .set_default("telemetry.filter", "info")?
        .set_default("telemetry.json", true)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.auth.validate()?;
    Ok(settings)
}
