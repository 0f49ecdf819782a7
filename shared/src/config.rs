//! # Application configuration
//!
//! Configuration is loaded from multiple sources in order of precedence:
//!
//! 1. **Default values** - sensible defaults for local development.
//! 2. **`.env` file** - local overrides (git-ignored).
//! 3. **Environment variables**, prefixed `EMULATOR_` with `__` as the
//!    nested-key separator, e.g. `EMULATOR_SERVER__PORT=9229`.
//!
//! ## Configuration sections
//!
//! | Section | Purpose |
//! |---------|---------|
//! | `server` | HTTP bind address/port |
//! | `data_store` | Directory holding the on-disk JSON documents |
//! | `triggers` | Per-trigger external function URL, all optional |

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Root configuration object, built once at startup and shared by
/// reference/`Arc` for the life of the process.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data_store: DataStoreConfig,
    pub triggers: TriggersConfig,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default)]
    pub environment: AppEnvironment,
}

/// HTTP server bind settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on. Also embedded verbatim in every issued token's
    /// `iss` claim as `http://localhost:<port>/<UserPoolId>`, matching the
    /// upstream service's default of `9229`.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub workers: usize,
}

/// Where user-pool and shared-client documents are persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct DataStoreConfig {
    /// Directory holding one JSON file per user pool plus the shared
    /// clients file. Created on startup if missing.
    #[serde(default = "default_data_directory")]
    pub directory: String,
}

/// Per-trigger external function endpoint, by trigger name. Each is an
/// HTTP(S) URL the Lambda invoker `POST`s the event envelope to; a `None`
/// entry means that trigger is disabled for every pool (the `Triggers`
/// façade's `enabled()` probe reads from here).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggersConfig {
    pub pre_sign_up: Option<String>,
    pub post_confirmation: Option<String>,
    pub post_authentication: Option<String>,
    pub user_migration: Option<String>,
    pub custom_message: Option<String>,
    pub pre_token_generation: Option<String>,
}

/// Runtime environment; affects log format only (§6 AMBIENT logging).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    #[default]
    Development,
    Production,
}

impl AppConfig {
    /// Loads configuration from `.env` (if present) and `EMULATOR_*`
    /// environment variables, falling back to the defaults below.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("server.workers", 0)?
            .set_default("data_store.directory", default_data_directory())?
            .set_default("environment", "development")?
            .set_default("service_name", default_service_name())?
            .add_source(
                Environment::with_prefix("EMULATOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    #[inline]
    pub fn is_development(&self) -> bool {
        self.environment == AppEnvironment::Development
    }

    #[inline]
    pub fn is_production(&self) -> bool {
        self.environment == AppEnvironment::Production
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9229
}

fn default_data_directory() -> String {
    ".data".to_string()
}

fn default_service_name() -> String {
    "cognito-local-emulator".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_development() {
        assert_eq!(AppEnvironment::default(), AppEnvironment::Development);
    }

    #[test]
    fn default_port_matches_upstream_default() {
        assert_eq!(default_port(), 9229);
    }

    #[test]
    fn triggers_config_defaults_to_all_disabled() {
        let triggers = TriggersConfig::default();
        assert!(triggers.pre_sign_up.is_none());
        assert!(triggers.post_confirmation.is_none());
        assert!(triggers.post_authentication.is_none());
        assert!(triggers.user_migration.is_none());
        assert!(triggers.custom_message.is_none());
        assert!(triggers.pre_token_generation.is_none());
    }
}
