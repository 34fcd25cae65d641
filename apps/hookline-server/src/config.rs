//! Application configuration loaded from environment variables.
//!
//! This module provides fail-fast configuration loading with validation.
//! Required variables must be present and valid, or the application will
//! exit with a clear error message.

use std::env;
use thiserror::Error;

/// Default WEBHOOK_ENCRYPTION_KEY: 64 hex '4' characters (insecure, development only).
pub const INSECURE_WEBHOOK_KEY: &str =
    "4444444444444444444444444444444444444444444444444444444444444444";

/// Application environment mode.
///
/// Controls security enforcement behavior:
/// - `Development`: Insecure defaults are allowed with WARN-level logging.
/// - `Production`: Insecure defaults cause the application to refuse startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    /// Parse from the `APP_ENV` environment variable value.
    /// Defaults to `Development` if unset or unrecognized.
    pub fn from_env_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => {
                tracing::warn!(
                    value = other,
                    "Unrecognized APP_ENV value, defaulting to Development"
                );
                Self::Development
            }
        }
    }

    /// Returns true if this is production mode.
    #[must_use]
    pub fn is_production(&self) -> bool {
        *self == Self::Production
    }
}

impl std::fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Failed to parse port: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Delivery worker tuning knobs.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Maximum concurrent outbound deliveries. Default: 8.
    pub concurrency: usize,

    /// Milliseconds between polls for due deliveries. Default: 1000.
    pub poll_interval_ms: u64,

    /// Maximum deliveries claimed per poll. Default: 20.
    pub batch_size: i64,

    /// Claim lease duration in seconds; claims older than this are
    /// considered abandoned and re-claimable. Default: 120.
    pub lease_secs: i64,
}

impl WorkerSettings {
    /// Load worker settings from environment variables.
    ///
    /// - `WORKER_CONCURRENCY` — default: 8 (minimum: 1)
    /// - `WORKER_POLL_INTERVAL_MS` — default: 1000 (minimum: 100)
    /// - `WORKER_BATCH_SIZE` — default: 20 (minimum: 1)
    /// - `WORKER_LEASE_SECS` — default: 120 (minimum: 10)
    pub fn from_env() -> Self {
        let concurrency = env::var("WORKER_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8)
            .max(1);

        let poll_interval_ms = env::var("WORKER_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1000)
            .max(100);

        let batch_size = env::var("WORKER_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(20)
            .max(1);

        let lease_secs = env::var("WORKER_LEASE_SECS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(120)
            .max(10);

        Self {
            concurrency,
            poll_interval_ms,
            batch_size,
            lease_secs,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Application environment (development or production).
    pub app_env: AppEnvironment,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Tracing filter directive (e.g., "info,hookline=debug")
    pub rust_log: String,

    /// Server bind address
    pub host: String,

    /// Server listen port
    pub port: u16,

    /// Webhook encryption key (32 bytes, hex-encoded) for encrypting endpoint secrets
    pub webhook_encryption_key: [u8; 32],

    /// Allow plain-http destination URLs (development only)
    pub allow_http: bool,

    /// Allow destination URLs resolving to private/internal hosts (development only)
    pub allow_private_hosts: bool,

    /// Delivery worker tuning
    pub worker: WorkerSettings,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("app_env", &self.app_env)
            .field("database_url", &"[redacted]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("allow_http", &self.allow_http)
            .field("allow_private_hosts", &self.allow_private_hosts)
            .field("worker", &self.worker)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required variables are missing
    /// - Values are invalid (e.g., invalid port number)
    ///
    /// # Required Variables
    ///
    /// - `DATABASE_URL` - PostgreSQL connection string
    ///
    /// # Optional Variables
    ///
    /// - `RUST_LOG` - Log level filter (default: "info")
    /// - `HOST` - Bind address (default: "0.0.0.0")
    /// - `PORT` - Listen port (default: 8080)
    /// - `WEBHOOK_ENCRYPTION_KEY` - 64 hex chars (default is insecure, dev only)
    /// - `WEBHOOK_ALLOW_HTTP` - allow http:// destinations (default: false)
    /// - `WEBHOOK_ALLOW_PRIVATE_HOSTS` - allow private-network destinations (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development only)
        let _ = dotenvy::dotenv();

        let app_env = AppEnvironment::from_env_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()?;

        if port == 0 {
            return Err(ConfigError::InvalidValue {
                var: "PORT".to_string(),
                message: "Port must be between 1 and 65535".to_string(),
            });
        }

        // Webhook encryption key (hex-encoded 32 bytes)
        let webhook_encryption_key = parse_hex_encryption_key(
            "WEBHOOK_ENCRYPTION_KEY",
            &env::var("WEBHOOK_ENCRYPTION_KEY")
                .unwrap_or_else(|_| INSECURE_WEBHOOK_KEY.to_string()),
        )?;

        let allow_http = parse_bool_var("WEBHOOK_ALLOW_HTTP");
        let allow_private_hosts = parse_bool_var("WEBHOOK_ALLOW_PRIVATE_HOSTS");

        let worker = WorkerSettings::from_env();

        Ok(Config {
            app_env,
            database_url,
            rust_log,
            host,
            port,
            webhook_encryption_key,
            allow_http,
            allow_private_hosts,
            worker,
        })
    }

    /// Get the server bind address as a socket address string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate security configuration based on the application environment.
    ///
    /// In **production** mode: returns `Err(errors)` listing all insecure settings found.
    /// In **development** mode: returns `Ok(warnings)` listing all insecure settings found.
    ///
    /// This function checks:
    /// - WEBHOOK_ENCRYPTION_KEY is not the all-0x44 default
    /// - WEBHOOK_ALLOW_HTTP is not enabled
    /// - WEBHOOK_ALLOW_PRIVATE_HOSTS is not enabled
    pub fn validate_security_config(&self) -> Result<Vec<String>, Vec<String>> {
        let mut issues = Vec::new();

        if self.webhook_encryption_key == [0x44u8; 32] {
            issues.push(
                "WEBHOOK_ENCRYPTION_KEY is using the default insecure value (all 0x44)".to_string(),
            );
        }

        if self.allow_http {
            issues.push(
                "WEBHOOK_ALLOW_HTTP is enabled; webhook payloads will be sent unencrypted"
                    .to_string(),
            );
        }

        if self.allow_private_hosts {
            issues.push(
                "WEBHOOK_ALLOW_PRIVATE_HOSTS is enabled; deliveries may reach internal hosts"
                    .to_string(),
            );
        }

        if issues.is_empty() {
            return Ok(Vec::new());
        }

        if self.app_env.is_production() {
            Err(issues)
        } else {
            Ok(issues)
        }
    }
}

/// Parse a boolean environment variable ("true"/"1"/"yes" are truthy).
fn parse_bool_var(var_name: &str) -> bool {
    env::var(var_name)
        .map(|s| matches!(s.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Parse hex-encoded 32-byte encryption key
fn parse_hex_encryption_key(var_name: &str, hex_str: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(hex_str).map_err(|_| ConfigError::InvalidValue {
        var: var_name.to_string(),
        message: "Must be 64 hex characters (32 bytes)".to_string(),
    })?;

    if bytes.len() != 32 {
        return Err(ConfigError::InvalidValue {
            var: var_name.to_string(),
            message: format!("Expected 32 bytes, got {}", bytes.len()),
        });
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(app_env: AppEnvironment) -> Config {
        Config {
            app_env,
            database_url: "postgres://localhost/test".to_string(),
            rust_log: "info".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            webhook_encryption_key: [0xAAu8; 32],
            allow_http: false,
            allow_private_hosts: false,
            worker: WorkerSettings {
                concurrency: 8,
                poll_interval_ms: 1000,
                batch_size: 20,
                lease_secs: 120,
            },
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: TEST_VAR"
        );

        let err = ConfigError::InvalidValue {
            var: "PORT".to_string(),
            message: "Must be a number".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid value for PORT: Must be a number");
    }

    #[test]
    fn test_bind_addr() {
        let mut config = test_config(AppEnvironment::Development);
        config.host = "127.0.0.1".to_string();
        config.port = 3000;
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_app_environment_parse() {
        assert_eq!(
            AppEnvironment::from_env_str("production"),
            AppEnvironment::Production
        );
        assert_eq!(
            AppEnvironment::from_env_str("prod"),
            AppEnvironment::Production
        );
        assert_eq!(
            AppEnvironment::from_env_str("PRODUCTION"),
            AppEnvironment::Production
        );
        assert_eq!(
            AppEnvironment::from_env_str("development"),
            AppEnvironment::Development
        );
        assert_eq!(
            AppEnvironment::from_env_str("dev"),
            AppEnvironment::Development
        );
    }

    #[test]
    fn test_app_environment_unrecognized_defaults_to_development() {
        assert_eq!(
            AppEnvironment::from_env_str("staging"),
            AppEnvironment::Development
        );
        assert_eq!(AppEnvironment::from_env_str(""), AppEnvironment::Development);
    }

    #[test]
    fn test_app_environment_display() {
        assert_eq!(AppEnvironment::Development.to_string(), "development");
        assert_eq!(AppEnvironment::Production.to_string(), "production");
    }

    #[test]
    fn test_parse_hex_encryption_key_valid() {
        let key = parse_hex_encryption_key("TEST_KEY", INSECURE_WEBHOOK_KEY).unwrap();
        assert_eq!(key, [0x44u8; 32]);
    }

    #[test]
    fn test_parse_hex_encryption_key_rejects_bad_hex() {
        let result = parse_hex_encryption_key("TEST_KEY", "not-hex");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_hex_encryption_key_rejects_wrong_length() {
        let result = parse_hex_encryption_key("TEST_KEY", "aabbcc");
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Expected 32 bytes"));
    }

    #[test]
    fn test_production_rejects_default_webhook_key() {
        let mut config = test_config(AppEnvironment::Production);
        config.webhook_encryption_key = [0x44u8; 32];

        let result = config.validate_security_config();
        assert!(result.is_err());
        let errors = result.unwrap_err();
        assert!(errors.iter().any(|e| e.contains("WEBHOOK_ENCRYPTION_KEY")));
    }

    #[test]
    fn test_production_rejects_permissive_url_policy() {
        let mut config = test_config(AppEnvironment::Production);
        config.allow_http = true;
        config.allow_private_hosts = true;

        let result = config.validate_security_config();
        assert!(result.is_err());
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_development_allows_insecure_defaults_with_warnings() {
        let mut config = test_config(AppEnvironment::Development);
        config.webhook_encryption_key = [0x44u8; 32];
        config.allow_http = true;

        let result = config.validate_security_config();
        assert!(result.is_ok());
        let warnings = result.unwrap();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_production_passes_with_secure_config() {
        let config = test_config(AppEnvironment::Production);

        let result = config.validate_security_config();
        assert!(result.is_ok());
        assert!(result.unwrap().is_empty());
    }
}
