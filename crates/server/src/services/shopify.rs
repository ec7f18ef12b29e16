//! Shopify Admin REST client: orders, refunds, and shop settings.
//!
//! Orders are fetched with cursor pagination via the `Link` response header,
//! followed until no `rel="next"` target remains. A repeated page URL stops
//! the loop instead of refetching.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use spendsheet_core::ShopifyCredentials;

use super::backoff::{self, RateLimit};

const PAGE_LIMIT: &str = "250";

/// Errors from the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success response.
    #[error("API error: {status}: {message}")]
    Api { status: u16, message: String },

    /// Rate limited by Shopify.
    #[error("rate limited by Shopify")]
    RateLimited { retry_after: Option<u64> },

    /// Response body was unparseable.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Shop settings returned an unknown IANA timezone.
    #[error("unknown store timezone: {0}")]
    Timezone(String),
}

impl ShopifyError {
    /// The sentinel string written to the sheet in place of a numeric result.
    #[must_use]
    pub fn sentinel(&self) -> String {
        match self {
            Self::Api { status, .. } => format!("ERROR API (Shopify {status})"),
            Self::RateLimited { .. } => "ERROR API (Shopify 429)".to_string(),
            Self::Http(_) => "ERROR API (Shopify fetch)".to_string(),
            Self::Parse(_) => "ERROR API (Shopify parse)".to_string(),
            Self::Timezone(_) => "ERROR API (Shopify timezone)".to_string(),
        }
    }
}

impl RateLimit for ShopifyError {
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

/// Which timestamp field constrains an orders query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderWindow {
    /// Filter by order creation time (gross sales, order count).
    Created,
    /// Filter by order update time (catches refunds against older orders).
    Updated,
}

impl OrderWindow {
    const fn min_param(self) -> &'static str {
        match self {
            Self::Created => "created_at_min",
            Self::Updated => "updated_at_min",
        }
    }

    const fn max_param(self) -> &'static str {
        match self {
            Self::Created => "created_at_max",
            Self::Updated => "updated_at_max",
        }
    }
}

/// An order as returned by the orders listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: u64,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub refunds: Vec<Refund>,
}

/// One line item on an order.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    pub price: Decimal,
    pub quantity: u32,
}

/// A refund recorded against an order.
#[derive(Debug, Clone, Deserialize)]
pub struct Refund {
    pub processed_at: DateTime<Utc>,
    #[serde(default)]
    pub transactions: Vec<RefundTransaction>,
    #[serde(default)]
    pub refund_line_items: Vec<RefundLineItem>,
    pub shipping: Option<RefundShipping>,
    pub amount: Option<Decimal>,
}

/// A payment transaction attached to a refund.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundTransaction {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub amount: Decimal,
}

/// An item-level entry of a refund.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundLineItem {
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub total_tax: Decimal,
}

/// Shipping portion of a refund.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundShipping {
    #[serde(default)]
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct OrdersResponse {
    #[serde(default)]
    orders: Vec<Order>,
}

#[derive(Debug, Deserialize)]
struct ShopResponse {
    shop: ShopSettings,
}

#[derive(Debug, Deserialize)]
struct ShopSettings {
    iana_timezone: String,
}

/// Shopify Admin REST client. Store address and token come from the sheet
/// column, so one client serves every store.
#[derive(Debug, Clone)]
pub struct ShopifyClient {
    http: reqwest::Client,
}

impl ShopifyClient {
    #[must_use]
    pub const fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// The store's IANA timezone from the shop-settings endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error on any fetch failure or when the returned zone name
    /// is not a known IANA timezone.
    pub async fn shop_timezone(&self, creds: &ShopifyCredentials) -> Result<Tz, ShopifyError> {
        let url = format!(
            "{}/admin/api/{}/shop.json",
            creds.shop_url, creds.api_version
        );
        let body: ShopResponse = backoff::retry_rate_limited("Shopify shop settings", || {
            self.get_json(&url, &creds.access_token)
        })
        .await?;
        body.shop
            .iana_timezone
            .parse::<Tz>()
            .map_err(|_| ShopifyError::Timezone(body.shop.iana_timezone))
    }

    /// Fetch every order whose window timestamp falls inside
    /// `[start, end]`, following pagination to exhaustion.
    ///
    /// `start`/`end` are RFC 3339 timestamps with explicit offsets. All
    /// pages are concatenated before any totals are computed.
    ///
    /// # Errors
    ///
    /// Returns the first page failure; 429s are retried with backoff first.
    pub async fn orders_in_window(
        &self,
        creds: &ShopifyCredentials,
        window: OrderWindow,
        start: &str,
        end: &str,
    ) -> Result<Vec<Order>, ShopifyError> {
        let mut url = Url::parse(&format!(
            "{}/admin/api/{}/orders.json",
            creds.shop_url, creds.api_version
        ))
        .map_err(|e| ShopifyError::Parse(format!("shop url: {e}")))?;
        url.query_pairs_mut()
            .append_pair(window.min_param(), start)
            .append_pair(window.max_param(), end)
            .append_pair("status", "any")
            .append_pair("limit", PAGE_LIMIT);

        let mut orders = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut next = Some(url.to_string());

        while let Some(page_url) = next {
            if !visited.insert(page_url.clone()) {
                tracing::warn!(url = %page_url, "repeated pagination cursor, stopping");
                break;
            }
            let (mut page, link_next) = backoff::retry_rate_limited("Shopify orders", || {
                self.fetch_page(&page_url, &creds.access_token)
            })
            .await?;
            orders.append(&mut page);
            next = link_next;
        }

        Ok(orders)
    }

    async fn fetch_page(
        &self,
        url: &str,
        token: &SecretString,
    ) -> Result<(Vec<Order>, Option<String>), ShopifyError> {
        let response = self
            .http
            .get(url)
            .header("X-Shopify-Access-Token", token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ShopifyError::RateLimited {
                retry_after: backoff::retry_after_secs(&response),
            });
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ShopifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        // The next-page cursor lives in the Link header, read it before the
        // body consumes the response.
        let next = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_link);

        let body: OrdersResponse = response
            .json()
            .await
            .map_err(|e| ShopifyError::Parse(format!("orders body: {e}")))?;

        Ok((body.orders, next))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        token: &SecretString,
    ) -> Result<T, ShopifyError> {
        let response = self
            .http
            .get(url)
            .header("X-Shopify-Access-Token", token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ShopifyError::RateLimited {
                retry_after: backoff::retry_after_secs(&response),
            });
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ShopifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ShopifyError::Parse(format!("response body: {e}")))
    }
}

/// Extract the `rel="next"` target from a `Link` header value.
pub(crate) fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        params
            .contains(r#"rel="next""#)
            .then(|| {
                target
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string()
            })
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_next_link_single() {
        let header = r#"<https://shop.example/orders.json?page_info=abc&limit=250>; rel="next""#;
        assert_eq!(
            parse_next_link(header).unwrap(),
            "https://shop.example/orders.json?page_info=abc&limit=250"
        );
    }

    #[test]
    fn test_parse_next_link_with_previous() {
        let header = r#"<https://shop.example/orders.json?page_info=prev>; rel="previous", <https://shop.example/orders.json?page_info=next>; rel="next""#;
        assert_eq!(
            parse_next_link(header).unwrap(),
            "https://shop.example/orders.json?page_info=next"
        );
    }

    #[test]
    fn test_parse_next_link_absent() {
        let header = r#"<https://shop.example/orders.json?page_info=prev>; rel="previous""#;
        assert!(parse_next_link(header).is_none());
    }

    #[test]
    fn test_order_deserializes_string_prices() {
        let order: Order = serde_json::from_str(
            r#"{
                "id": 1001,
                "total_price": "50.00",
                "created_at": "2024-05-06T10:00:00-04:00",
                "updated_at": "2024-05-06T10:00:00-04:00",
                "line_items": [{"price": "25.00", "quantity": 2}],
                "refunds": []
            }"#,
        )
        .unwrap();
        assert_eq!(order.total_price, Decimal::from_str("50.00").unwrap());
        assert_eq!(order.line_items.first().unwrap().quantity, 2);
    }

    #[test]
    fn test_refund_deserializes_with_defaults() {
        let refund: Refund = serde_json::from_str(
            r#"{
                "processed_at": "2024-05-07T09:00:00Z",
                "transactions": [{"kind": "refund", "status": "success", "amount": "20.00"}],
                "amount": "20.00"
            }"#,
        )
        .unwrap();
        assert!(refund.refund_line_items.is_empty());
        assert!(refund.shipping.is_none());
        assert_eq!(
            refund.transactions.first().unwrap().amount,
            Decimal::from_str("20.00").unwrap()
        );
    }

    #[test]
    fn test_window_params() {
        assert_eq!(OrderWindow::Created.min_param(), "created_at_min");
        assert_eq!(OrderWindow::Created.max_param(), "created_at_max");
        assert_eq!(OrderWindow::Updated.min_param(), "updated_at_min");
        assert_eq!(OrderWindow::Updated.max_param(), "updated_at_max");
    }
}
