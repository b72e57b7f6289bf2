//! Configuration module for MyDiet Core.
//!
//! Values are layered, later sources winning:
//! 1. Built-in defaults
//! 2. TOML file (`mydiet.toml` in the working directory, or an explicit path)
//! 3. Environment variables prefixed with `MYDIET_`, nested keys joined by `__`
//!    (e.g. `MYDIET_TRAINER__BASE_URL`)

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Environment, File, Map};
use serde::Deserialize;

use crate::error::{GatewayError, Result};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "MYDIET";

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "mydiet.toml";

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address to bind the gateway to.
    #[serde(default = "default_address")]
    pub address: SocketAddr,
    /// Maximum accepted request body size, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Answer CORS preflights for any origin.
    #[serde(default = "default_true")]
    pub cors_allow_any_origin: bool,
    /// Add baseline security headers (`nosniff`, frame and referrer policy, ...).
    #[serde(default = "default_true")]
    pub security_headers: bool,
    /// Per-client request limit on `/api`.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Per-client rate limit: at most `max_requests` per `window_secs`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rate_limit_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_rate_limit_window_secs")]
    pub window_secs: u64,
}

fn default_rate_limit_max_requests() -> u32 {
    100
}

fn default_rate_limit_window_secs() -> u64 {
    15 * 60
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_rate_limit_max_requests(),
            window_secs: default_rate_limit_window_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            max_upload_bytes: default_max_upload_bytes(),
            cors_allow_any_origin: true,
            security_headers: true,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// External trainer service configuration.
///
/// There is deliberately no default `base_url`: the gateway refuses to start
/// without one.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainerConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request timeout for outbound calls, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self { base_url: None, timeout_secs: default_timeout_secs() }
    }
}

impl TrainerConfig {
    /// Returns the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no base URL was supplied.
    pub fn base_url(&self) -> Result<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                GatewayError::Config(format!(
                    "trainer.base_url is required (set it in {DEFAULT_CONFIG_FILE} or via {ENV_PREFIX}_TRAINER__BASE_URL)"
                ))
            })
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Metrics store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("mydiet.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { database_path: default_database_path() }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Root configuration for the gateway.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub trainer: TrainerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the config file and environment variables.
    ///
    /// With `path` set the file must exist; otherwise `mydiet.toml` is read
    /// when present.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`Config::load`], reading environment overrides from `env`
    /// instead of the process environment when it is `Some`.
    pub fn load_with_env(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let settings = ::config::Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        let base_url = self.trainer.base_url()?;
        mydiet_training::http::parse_base_url(base_url)
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        if self.trainer.timeout_secs == 0 {
            return Err(GatewayError::Config("trainer.timeout_secs must be greater than 0".to_string()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(GatewayError::Config(
                "server.max_upload_bytes must be greater than 0".to_string(),
            ));
        }
        let limit = &self.server.rate_limit;
        if limit.enabled && (limit.max_requests == 0 || limit.window_secs == 0) {
            return Err(GatewayError::Config(
                "server.rate_limit needs max_requests and window_secs greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect())
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address, "127.0.0.1:5000".parse().unwrap());
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert!(config.cors_allow_any_origin);
        assert!(config.security_headers);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(900));
    }

    #[test]
    fn test_rate_limit_from_env_and_validation() {
        let config = Config::load_with_env(
            None,
            env(&[
                ("MYDIET_TRAINER__BASE_URL", "http://localhost:5001"),
                ("MYDIET_SERVER__RATE_LIMIT__MAX_REQUESTS", "5"),
                ("MYDIET_SERVER__RATE_LIMIT__WINDOW_SECS", "60"),
            ]),
        )
        .unwrap();
        assert_eq!(config.server.rate_limit.max_requests, 5);
        assert_eq!(config.server.rate_limit.window_secs, 60);

        let mut config = config;
        config.server.rate_limit.max_requests = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.rate_limit"));

        config.server.rate_limit.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trainer_base_url_has_no_default() {
        let config = Config::default();
        assert!(config.trainer.base_url.is_none());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("trainer.base_url is required"));
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
            [server]
            address = "0.0.0.0:8080"
            max_upload_bytes = 1024

            [trainer]
            base_url = "http://trainer:5001"
            timeout_secs = 5

            [storage]
            database_path = "/var/lib/mydiet/metrics.db"

            [logging]
            format = "json"
            "#,
        );

        let config = Config::load_with_env(Some(file.path()), env(&[])).unwrap();
        assert_eq!(config.server.address, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.server.max_upload_bytes, 1024);
        assert_eq!(config.trainer.base_url().unwrap(), "http://trainer:5001");
        assert_eq!(config.trainer.timeout(), Duration::from_secs(5));
        assert_eq!(config.storage.database_path, PathBuf::from("/var/lib/mydiet/metrics.db"));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_config(
            r#"
            [trainer]
            base_url = "http://trainer:5001"
            "#,
        );

        let config = Config::load_with_env(
            Some(file.path()),
            env(&[
                ("MYDIET_TRAINER__BASE_URL", "http://10.0.0.7:5001"),
                ("MYDIET_TRAINER__TIMEOUT_SECS", "15"),
            ]),
        )
        .unwrap();
        assert_eq!(config.trainer.base_url().unwrap(), "http://10.0.0.7:5001");
        assert_eq!(config.trainer.timeout_secs, 15);
        assert_eq!(config.server.address, "127.0.0.1:5000".parse().unwrap());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::load_with_env(
            Some(Path::new("/definitely/not/here/mydiet.toml")),
            env(&[("MYDIET_TRAINER__BASE_URL", "http://localhost:5001")]),
        );
        assert!(matches!(result, Err(GatewayError::Settings(_))));
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let file = write_config(
            r#"
            [trainer]
            base_url = "localhost:5001"
            "#,
        );
        let err = Config::load_with_env(Some(file.path()), env(&[])).unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let file = write_config(
            r#"
            [trainer]
            base_url = "http://localhost:5001"
            timeout_secs = 0
            "#,
        );
        let err = Config::load_with_env(Some(file.path()), env(&[])).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }
}
