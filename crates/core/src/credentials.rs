//! Per-column advertiser/storefront credentials read from sheet header rows.
//!
//! Each sheet column pairs one Meta ad account with one Shopify store. An
//! integration's credentials are only considered present when every required
//! field is non-empty; otherwise that integration is reported with a
//! credentials sentinel and the other integration still runs.

use secrecy::SecretString;

use crate::layout::rows;

/// Meta Ads credentials for one column.
#[derive(Clone)]
pub struct MetaCredentials {
    /// Ad account id from the template (informational; insights queries are
    /// addressed per campaign).
    pub ad_account_id: Option<String>,
    /// Meta access token.
    pub access_token: SecretString,
    /// Campaign ids, already split and trimmed.
    pub campaign_ids: Vec<String>,
}

impl std::fmt::Debug for MetaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaCredentials")
            .field("ad_account_id", &self.ad_account_id)
            .field("access_token", &"[REDACTED]")
            .field("campaign_ids", &self.campaign_ids)
            .finish()
    }
}

/// Shopify credentials for one column.
#[derive(Clone)]
pub struct ShopifyCredentials {
    /// Admin API access token.
    pub access_token: SecretString,
    /// Shop URL, scheme and host (e.g. `https://acme.myshopify.com`).
    pub shop_url: String,
    /// Admin API version (e.g. `2024-04`).
    pub api_version: String,
}

impl std::fmt::Debug for ShopifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyCredentials")
            .field("access_token", &"[REDACTED]")
            .field("shop_url", &self.shop_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Credentials parsed from one sheet column.
#[derive(Debug, Clone)]
pub struct ColumnCredentials {
    /// 1-indexed sheet column.
    pub column: u32,
    /// Present only when the Meta token and at least one campaign id exist.
    pub meta: Option<MetaCredentials>,
    /// Present only when token, shop URL, and API version all exist.
    pub shopify: Option<ShopifyCredentials>,
}

impl ColumnCredentials {
    /// Parse one column's credentials via a row lookup.
    ///
    /// `cell` maps a 1-indexed credential row to that row's value in this
    /// column; empty and whitespace-only cells count as absent.
    pub fn from_lookup<'a>(column: u32, cell: impl Fn(u32) -> Option<&'a str>) -> Self {
        let field = |row: u32| {
            cell(row)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let meta = match (field(rows::META_TOKEN), field(rows::CAMPAIGN_IDS)) {
            (Some(token), Some(raw_ids)) => {
                let campaign_ids: Vec<String> = raw_ids
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect();
                (!campaign_ids.is_empty()).then(|| MetaCredentials {
                    ad_account_id: field(rows::AD_ACCOUNT_ID),
                    access_token: SecretString::from(token),
                    campaign_ids,
                })
            }
            _ => None,
        };

        let shopify = match (
            field(rows::SHOPIFY_TOKEN),
            field(rows::SHOP_URL),
            field(rows::API_VERSION),
        ) {
            (Some(token), Some(shop_url), Some(api_version)) => Some(ShopifyCredentials {
                access_token: SecretString::from(token),
                shop_url: shop_url.trim_end_matches('/').to_string(),
                api_version,
            }),
            _ => None,
        };

        Self {
            column,
            meta,
            shopify,
        }
    }
}
