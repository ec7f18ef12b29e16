//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHEET_ID` - Google Sheets spreadsheet id to read and write
//! - `SHEETS_ACCESS_TOKEN` - OAuth bearer token for the Sheets API
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8080)
//! - `SHEET_NAME` - Tab name holding the report (default: `Shopify Meta`)
//! - `SHEETS_BASE_URL` - Sheets API base (default: Google's endpoint)
//! - `META_BASE_URL` - Meta Graph API base (default: `v19.0` endpoint)
//! - `COLUMN_CONCURRENCY` - Max columns processed at once (default: 3)
//! - `REQUEST_DEADLINE_SECS` - Whole-run deadline (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_SHEET_NAME: &str = "Shopify Meta";
const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DEFAULT_META_BASE_URL: &str = "https://graph.facebook.com/v19.0";
const DEFAULT_COLUMN_CONCURRENCY: usize = 3;
const DEFAULT_REQUEST_DEADLINE_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// IP address to bind the server to.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Spreadsheet id receiving the report.
    pub sheet_id: String,
    /// Sheet (tab) name within the spreadsheet.
    pub sheet_name: String,
    /// OAuth bearer token for the Sheets API.
    pub sheets_token: SecretString,
    /// Sheets API base URL (overridable for tests).
    pub sheets_base_url: String,
    /// Meta Graph API base URL, version included (overridable for tests).
    pub meta_base_url: String,
    /// Maximum number of columns aggregated concurrently.
    pub column_concurrency: usize,
    /// Deadline for one whole report run.
    pub request_deadline: Duration,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production").
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("sheet_id", &self.sheet_id)
            .field("sheet_name", &self.sheet_name)
            .field("sheets_token", &"[REDACTED]")
            .field("sheets_base_url", &self.sheets_base_url)
            .field("meta_base_url", &self.meta_base_url)
            .field("column_concurrency", &self.column_concurrency)
            .field("request_deadline", &self.request_deadline)
            .field("sentry_environment", &self.sentry_environment)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;

        let column_concurrency = match get_optional_env("COLUMN_CONCURRENCY") {
            Some(raw) => raw.parse::<usize>().ok().filter(|n| *n >= 1).ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "COLUMN_CONCURRENCY".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?,
            None => DEFAULT_COLUMN_CONCURRENCY,
        };

        let request_deadline = match get_optional_env("REQUEST_DEADLINE_SECS") {
            Some(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                ConfigError::InvalidEnvVar("REQUEST_DEADLINE_SECS".to_string(), e.to_string())
            })?,
            None => Duration::from_secs(DEFAULT_REQUEST_DEADLINE_SECS),
        };

        Ok(Self {
            host,
            port,
            sheet_id: get_required_env("SHEET_ID")?,
            sheet_name: get_env_or_default("SHEET_NAME", DEFAULT_SHEET_NAME),
            sheets_token: SecretString::from(get_required_env("SHEETS_ACCESS_TOKEN")?),
            sheets_base_url: get_env_or_default("SHEETS_BASE_URL", DEFAULT_SHEETS_BASE_URL),
            meta_base_url: get_env_or_default("META_BASE_URL", DEFAULT_META_BASE_URL),
            column_concurrency,
            request_deadline,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            sheet_id: "sheet-123".to_string(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            sheets_token: SecretString::from("ya29.test-token"),
            sheets_base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            meta_base_url: DEFAULT_META_BASE_URL.to_string(),
            column_concurrency: DEFAULT_COLUMN_CONCURRENCY,
            request_deadline: Duration::from_secs(DEFAULT_REQUEST_DEADLINE_SECS),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_debug_redacts_sheets_token() {
        let debug = format!("{:?}", test_config());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("ya29.test-token"));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(DEFAULT_SHEET_NAME, "Shopify Meta");
        assert_eq!(DEFAULT_COLUMN_CONCURRENCY, 3);
        assert!(DEFAULT_META_BASE_URL.contains("graph.facebook.com"));
    }
}
