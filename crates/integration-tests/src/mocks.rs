//! In-process mock of the three remote APIs.
//!
//! One axum router plays Google Sheets, the Meta Graph API, and any number
//! of Shopify stores at once. Behaviors are scripted per campaign id and
//! per store; every `values:batchUpdate` body is captured for assertions.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use spendsheet_core::layout::rows;

type Shared = Arc<Mutex<MockData>>;

#[derive(Default)]
struct MockData {
    base_url: String,
    grid: Vec<Vec<Value>>,
    campaigns: HashMap<String, CampaignMock>,
    shops: HashMap<String, ShopMock>,
    writes: Vec<Value>,
}

/// Scripted behavior of one campaign's insights endpoint.
#[derive(Clone, Default)]
pub struct CampaignMock {
    /// Spend reported for any queried window; `None` reports no delivery.
    pub spend: Option<String>,
    /// Respond with this HTTP status instead of data.
    pub fail_status: Option<u16>,
    /// 429 responses (with `Retry-After: 0`) served before the real one.
    pub rate_limits: u32,
}

/// Scripted behavior of one Shopify store.
#[derive(Clone, Default)]
pub struct ShopMock {
    /// IANA timezone returned by the shop-settings endpoint.
    pub timezone: String,
    /// Order pages served to created-window queries, in link order.
    pub created_pages: Vec<Vec<Value>>,
    /// Order pages served to updated-window queries, in link order.
    pub updated_pages: Vec<Vec<Value>>,
    /// 429 responses (with `Retry-After: 0`) served before order pages.
    pub rate_limits: u32,
    /// Answer every orders request with a `Link` header pointing back at
    /// the request's own URL, a cursor that never advances.
    pub repeat_cursor: bool,
}

/// One configured store column of the credential grid.
///
/// Empty fields read as absent cells, so a partially filled fixture
/// produces a column with missing credentials.
#[derive(Clone, Default)]
pub struct StoreColumn {
    pub label: String,
    pub ad_account_id: String,
    pub meta_token: String,
    pub campaign_ids: String,
    pub shopify_token: String,
    pub shop_url: String,
    pub api_version: String,
}

/// Build the 14-row credential block for the given columns.
///
/// Column 1 is the label column; fixtures fill columns 2 onward.
pub fn credential_grid(columns: &[StoreColumn]) -> Vec<Vec<Value>> {
    let width = columns.len() + 1;
    let mut grid = vec![vec![json!(""); width]; rows::BLOCK_END as usize];
    grid[0][0] = json!("Stores");
    for (i, column) in columns.iter().enumerate() {
        let set = |grid: &mut Vec<Vec<Value>>, row: u32, value: &str| {
            grid[(row - 1) as usize][i + 1] = json!(value);
        };
        grid[0][i + 1] = json!(column.label);
        set(&mut grid, rows::AD_ACCOUNT_ID, &column.ad_account_id);
        set(&mut grid, rows::META_TOKEN, &column.meta_token);
        set(&mut grid, rows::CAMPAIGN_IDS, &column.campaign_ids);
        set(&mut grid, rows::SHOPIFY_TOKEN, &column.shopify_token);
        set(&mut grid, rows::SHOP_URL, &column.shop_url);
        set(&mut grid, rows::API_VERSION, &column.api_version);
    }
    grid
}

/// Minimal order body accepted by the orders client.
pub fn order(id: u64, total_price: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "total_price": total_price,
        "created_at": created_at,
        "updated_at": created_at,
        "line_items": [],
        "refunds": [],
    })
}

/// A successful refund transaction processed at the given instant.
pub fn refund(processed_at: &str, amount: &str) -> Value {
    json!({
        "processed_at": processed_at,
        "transactions": [{"kind": "refund", "status": "success", "amount": amount}],
        "amount": amount,
    })
}

/// Handle to the running mock server and its scripted state.
pub struct MockServer {
    base_url: String,
    data: Shared,
}

impl MockServer {
    /// Bind an ephemeral port and serve the mock router in the background.
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let data: Shared = Arc::new(Mutex::new(MockData {
            base_url: base_url.clone(),
            ..MockData::default()
        }));
        let app = router(Arc::clone(&data));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { base_url, data }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The shop URL to place in a grid column for the named store.
    #[must_use]
    pub fn shop_url(&self, shop: &str) -> String {
        format!("{}/shops/{shop}", self.base_url)
    }

    pub fn set_grid(&self, grid: Vec<Vec<Value>>) {
        self.data.lock().unwrap().grid = grid;
    }

    pub fn insert_campaign(&self, id: &str, mock: CampaignMock) {
        self.data
            .lock()
            .unwrap()
            .campaigns
            .insert(id.to_string(), mock);
    }

    pub fn insert_shop(&self, name: &str, mock: ShopMock) {
        self.data.lock().unwrap().shops.insert(name.to_string(), mock);
    }

    /// Every written cell across all captured batches, keyed by A1 range.
    #[must_use]
    pub fn written_cells(&self) -> BTreeMap<String, Value> {
        let data = self.data.lock().unwrap();
        let mut cells = BTreeMap::new();
        for body in &data.writes {
            for entry in body["data"].as_array().into_iter().flatten() {
                if let (Some(range), Some(value)) =
                    (entry["range"].as_str(), entry["values"][0].get(0))
                {
                    cells.insert(range.to_string(), value.clone());
                }
            }
        }
        cells
    }

    /// Number of `values:batchUpdate` calls received.
    #[must_use]
    pub fn write_batches(&self) -> usize {
        self.data.lock().unwrap().writes.len()
    }
}

fn router(data: Shared) -> Router {
    Router::new()
        .route("/v4/spreadsheets/{sheet}/values/{range}", get(get_values))
        .route(
            "/v4/spreadsheets/{sheet}/values:batchUpdate",
            post(batch_update),
        )
        .route("/meta/{campaign}/insights", get(meta_insights))
        .route(
            "/shops/{shop}/admin/api/{version}/shop.json",
            get(shop_settings),
        )
        .route("/shops/{shop}/admin/api/{version}/orders.json", get(orders))
        .with_state(data)
}

async fn get_values(
    State(data): State<Shared>,
    Path((_sheet, range)): Path<(String, String)>,
) -> Json<Value> {
    let data = data.lock().unwrap();
    // The header read spans row 1 only; everything else gets the block.
    let values: Vec<Vec<Value>> = if range.ends_with("!A1:1") {
        data.grid.first().cloned().into_iter().collect()
    } else {
        data.grid.clone()
    };
    Json(json!({
        "range": range,
        "majorDimension": "ROWS",
        "values": values,
    }))
}

async fn batch_update(
    State(data): State<Shared>,
    Path(_sheet): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut data = data.lock().unwrap();
    let total = body["data"].as_array().map_or(0, Vec::len);
    data.writes.push(body);
    Json(json!({ "totalUpdatedCells": total }))
}

async fn meta_insights(State(data): State<Shared>, Path(campaign): Path<String>) -> Response {
    let mut data = data.lock().unwrap();
    let Some(mock) = data.campaigns.get_mut(&campaign) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"message": "unknown campaign"}})),
        )
            .into_response();
    };
    if mock.rate_limits > 0 {
        mock.rate_limits -= 1;
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "0")],
            Json(json!({"error": {"message": "rate limited"}})),
        )
            .into_response();
    }
    if let Some(status) = mock.fail_status {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({"error": {"message": "scripted failure"}}))).into_response();
    }
    let rows: Vec<Value> = mock.spend.iter().map(|s| json!({"spend": s})).collect();
    Json(json!({ "data": rows })).into_response()
}

async fn shop_settings(
    State(data): State<Shared>,
    Path((shop, _version)): Path<(String, String)>,
) -> Response {
    let data = data.lock().unwrap();
    match data.shops.get(&shop) {
        Some(mock) => Json(json!({"shop": {"iana_timezone": mock.timezone}})).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"errors": "Not Found"}))).into_response(),
    }
}

async fn orders(
    State(data): State<Shared>,
    Path((shop, version)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    uri: Uri,
) -> Response {
    let mut data = data.lock().unwrap();
    let base = data.base_url.clone();
    let Some(mock) = data.shops.get_mut(&shop) else {
        return (StatusCode::NOT_FOUND, Json(json!({"errors": "Not Found"}))).into_response();
    };
    if mock.rate_limits > 0 {
        mock.rate_limits -= 1;
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "0")],
            Json(json!({"errors": "Exceeded API rate limit"})),
        )
            .into_response();
    }

    let created = query.contains_key("created_at_min");
    let pages = if created {
        &mock.created_pages
    } else {
        &mock.updated_pages
    };
    let page: usize = query
        .get("page_info")
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);
    let orders = pages.get(page).cloned().unwrap_or_default();

    let mut headers = HeaderMap::new();
    if mock.repeat_cursor {
        let link = format!("<{base}{uri}>; rel=\"next\"");
        if let Ok(value) = HeaderValue::from_str(&link) {
            headers.insert(header::LINK, value);
        }
    } else if page + 1 < pages.len() {
        // Carry the window param so the next page stays in the same pass.
        let min_param = if created {
            "created_at_min"
        } else {
            "updated_at_min"
        };
        let link = format!(
            "<{base}/shops/{shop}/admin/api/{version}/orders.json?{min_param}=1&page_info={}&limit=250>; rel=\"next\"",
            page + 1
        );
        if let Ok(value) = HeaderValue::from_str(&link) {
            headers.insert(header::LINK, value);
        }
    }
    (headers, Json(json!({ "orders": orders }))).into_response()
}
