//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::meta::MetaAdsClient;
use crate::services::sheets::SheetsClient;
use crate::services::shopify::ShopifyClient;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    sheets: SheetsClient,
    meta: MetaAdsClient,
    shopify: ShopifyClient,
}

impl AppState {
    /// Build state from configuration; one shared HTTP connection pool
    /// backs all three clients.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let http = reqwest::Client::new();
        let sheets = SheetsClient::new(
            http.clone(),
            config.sheets_base_url.clone(),
            config.sheet_id.clone(),
            config.sheet_name.clone(),
            config.sheets_token.clone(),
        );
        let meta = MetaAdsClient::new(http.clone(), config.meta_base_url.clone());
        let shopify = ShopifyClient::new(http);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                sheets,
                meta,
                shopify,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn sheets(&self) -> &SheetsClient {
        &self.inner.sheets
    }

    #[must_use]
    pub fn meta(&self) -> &MetaAdsClient {
        &self.inner.meta
    }

    #[must_use]
    pub fn shopify(&self) -> &ShopifyClient {
        &self.inner.shopify
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
