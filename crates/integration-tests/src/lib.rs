//! End-to-end test support for Spendsheet.
//!
//! The remote collaborators (Google Sheets, Meta Graph API, Shopify Admin
//! API) are mocked as one in-process axum router; the report pipeline runs
//! against it unmodified via base-URL overrides in [`AppConfig`].
//!
//! [`AppConfig`]: spendsheet_server::config::AppConfig

// Test support code: panicking on malformed fixtures is the desired behavior.
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

pub mod mocks;

use std::time::Duration;

use secrecy::SecretString;
use spendsheet_server::config::AppConfig;

/// Build a server configuration pointed at the mock server.
#[must_use]
pub fn test_config(mock_base: &str) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        sheet_id: "sheet-test".to_string(),
        sheet_name: "Shopify Meta".to_string(),
        sheets_token: SecretString::from("test-sheets-token"),
        sheets_base_url: format!("{mock_base}/v4/spreadsheets"),
        meta_base_url: format!("{mock_base}/meta"),
        column_concurrency: 3,
        request_deadline: Duration::from_secs(30),
        sentry_dsn: None,
        sentry_environment: None,
    }
}
