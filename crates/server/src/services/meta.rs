//! Meta Ads insights client.
//!
//! One spend-insights query per campaign id; a column/period cell is the sum
//! across its campaign list. Any single campaign failure aborts the whole
//! cell - partial sums are never written.

use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use spendsheet_core::{DateRange, MetaCredentials, round_money};

use super::backoff::{self, RateLimit};

/// Errors from the Meta insights API.
#[derive(Debug, Error)]
pub enum MetaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success response.
    #[error("API error: {status}: {message}")]
    Api { status: u16, message: String },

    /// Rate limited by Meta.
    #[error("rate limited by Meta")]
    RateLimited { retry_after: Option<u64> },

    /// Response body or spend value was unparseable.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl MetaError {
    /// The sentinel string written to the sheet in place of a spend value.
    #[must_use]
    pub fn sentinel(&self) -> String {
        match self {
            Self::Api { status, .. } => format!("ERROR API (Meta {status})"),
            Self::RateLimited { .. } => "ERROR API (Meta 429)".to_string(),
            Self::Http(_) => "ERROR API (Meta fetch)".to_string(),
            Self::Parse(_) => "ERROR API (Meta parse)".to_string(),
        }
    }
}

impl RateLimit for MetaError {
    fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => retry_after.map(Duration::from_secs),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InsightsResponse {
    #[serde(default)]
    data: Vec<InsightRow>,
}

#[derive(Debug, Deserialize)]
struct InsightRow {
    spend: Option<String>,
}

/// Meta Ads API client.
#[derive(Debug, Clone)]
pub struct MetaAdsClient {
    http: reqwest::Client,
    base_url: String,
}

impl MetaAdsClient {
    /// Create a client against the given Graph API base (version included).
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Total spend across the column's campaign list for one date range.
    ///
    /// All-or-nothing: the first campaign failure aborts the sum. The result
    /// is rounded to 2 decimal places.
    ///
    /// # Errors
    ///
    /// Returns the first campaign query failure; 429s are retried with
    /// backoff before giving up.
    pub async fn total_spend(
        &self,
        creds: &MetaCredentials,
        range: &DateRange,
    ) -> Result<Decimal, MetaError> {
        let mut total = Decimal::ZERO;
        for campaign_id in &creds.campaign_ids {
            total += backoff::retry_rate_limited("Meta insights", || {
                self.campaign_spend(creds, campaign_id, range)
            })
            .await?;
        }
        Ok(round_money(total))
    }

    async fn campaign_spend(
        &self,
        creds: &MetaCredentials,
        campaign_id: &str,
        range: &DateRange,
    ) -> Result<Decimal, MetaError> {
        let url = format!("{}/{campaign_id}/insights", self.base_url);
        let since = range.since.to_string();
        let until = range.until.to_string();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("fields", "spend"),
                ("access_token", creds.access_token.expose_secret()),
                ("time_range[since]", since.as_str()),
                ("time_range[until]", until.as_str()),
                ("level", "campaign"),
                ("attribution_setting", "7d_click_1d_view"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(MetaError::RateLimited {
                retry_after: backoff::retry_after_secs(&response),
            });
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MetaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: InsightsResponse = response
            .json()
            .await
            .map_err(|e| MetaError::Parse(format!("insights body: {e}")))?;

        // An empty data array means no delivery in the window.
        let spend = body
            .data
            .first()
            .and_then(|row| row.spend.as_deref())
            .unwrap_or("0.00");
        spend
            .parse::<Decimal>()
            .map_err(|e| MetaError::Parse(format!("non-numeric spend '{spend}': {e}")))
    }
}
