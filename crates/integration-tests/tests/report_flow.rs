//! End-to-end report runs against the in-process API mocks.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use chrono_tz::Tz;
use serde_json::json;

use spendsheet_core::{CellValue, MetricCell, Mode, Period};
use spendsheet_integration_tests::mocks::{
    CampaignMock, MockServer, ShopMock, StoreColumn, credential_grid, order, refund,
};
use spendsheet_integration_tests::test_config;
use spendsheet_server::report::runner;
use spendsheet_server::state::AppState;

fn state_for(mock: &MockServer) -> AppState {
    AppState::new(test_config(mock.base_url()))
}

fn shop_column(mock: &MockServer, label: &str, shop: &str, campaigns: &str) -> StoreColumn {
    StoreColumn {
        label: label.to_string(),
        ad_account_id: "act_1".to_string(),
        meta_token: "meta-token".to_string(),
        campaign_ids: campaigns.to_string(),
        shopify_token: "shpat_test".to_string(),
        shop_url: mock.shop_url(shop),
        api_version: "2024-04".to_string(),
    }
}

/// An instant guaranteed inside the lastWeek window in the given zone.
fn last_week_start(tz: Tz) -> String {
    let today = Utc::now().with_timezone(&tz).date_naive();
    Period::LastWeek.resolve(today).start_timestamp(tz)
}

#[tokio::test]
async fn test_last_week_run_writes_spend_net_sales_and_count() {
    let mock = MockServer::start().await;
    let tz: Tz = "America/New_York".parse().unwrap();
    let in_window = last_week_start(tz);

    mock.set_grid(credential_grid(&[shop_column(&mock, "Acme", "acme", "c1")]));
    mock.insert_campaign(
        "c1",
        CampaignMock {
            spend: Some("25.50".to_string()),
            ..Default::default()
        },
    );

    // Three orders of 50.00 created in the window; one picks up a 20.00
    // refund, surfaced through the updated-window pass.
    let mut refunded = order(1003, "50.00", &in_window);
    refunded["refunds"] = json!([refund(&in_window, "20.00")]);
    mock.insert_shop(
        "acme",
        ShopMock {
            timezone: "America/New_York".to_string(),
            created_pages: vec![vec![
                order(1001, "50.00", &in_window),
                order(1002, "50.00", &in_window),
                order(1003, "50.00", &in_window),
            ]],
            updated_pages: vec![vec![refunded]],
            ..Default::default()
        },
    );

    let state = state_for(&mock);
    let summary = runner::run_report(&state, Mode::LastWeek).await.unwrap();
    assert_eq!(summary.columns, 1);
    assert_eq!(summary.cells_written, 3);

    let cells = mock.written_cells();
    assert_eq!(cells["Shopify Meta!B9"], json!(25.5));
    assert_eq!(cells["Shopify Meta!B21"], json!(130.0));
    assert_eq!(cells["Shopify Meta!B24"], json!(3));
    assert_eq!(mock.write_batches(), 1);
}

#[tokio::test]
async fn test_partial_campaign_failure_never_writes_a_partial_sum() {
    let mock = MockServer::start().await;
    mock.set_grid(credential_grid(&[StoreColumn {
        label: "Acme".to_string(),
        meta_token: "meta-token".to_string(),
        campaign_ids: "c1, c2".to_string(),
        ..Default::default()
    }]));
    mock.insert_campaign(
        "c1",
        CampaignMock {
            spend: Some("10.005".to_string()),
            ..Default::default()
        },
    );
    mock.insert_campaign(
        "c2",
        CampaignMock {
            fail_status: Some(500),
            ..Default::default()
        },
    );

    let state = state_for(&mock);
    runner::run_report(&state, Mode::LastWeek).await.unwrap();

    let cells = mock.written_cells();
    assert_eq!(cells["Shopify Meta!B9"], json!("ERROR API (Meta 500)"));
    assert_eq!(cells["Shopify Meta!B21"], json!("ERROR CREDENTIALS (Shopify)"));
    assert_eq!(cells["Shopify Meta!B24"], json!("ERROR CREDENTIALS (Shopify)"));
}

#[tokio::test]
async fn test_missing_credentials_isolate_to_their_column() {
    let mock = MockServer::start().await;
    mock.set_grid(credential_grid(&[
        shop_column(&mock, "Acme", "acme", "c1"),
        StoreColumn {
            label: "Empty".to_string(),
            ..Default::default()
        },
    ]));
    mock.insert_campaign(
        "c1",
        CampaignMock {
            spend: Some("5.00".to_string()),
            ..Default::default()
        },
    );
    mock.insert_shop(
        "acme",
        ShopMock {
            timezone: "UTC".to_string(),
            ..Default::default()
        },
    );

    let state = state_for(&mock);
    let summary = runner::run_report(&state, Mode::LastWeek).await.unwrap();
    assert_eq!(summary.columns, 2);
    assert_eq!(summary.cells_written, 6);

    let cells = mock.written_cells();
    assert_eq!(cells["Shopify Meta!B9"], json!(5.0));
    // No orders at all: Decimal zero renders without a fraction.
    assert_eq!(cells["Shopify Meta!B21"], json!(0));
    assert_eq!(cells["Shopify Meta!B24"], json!(0));
    assert_eq!(cells["Shopify Meta!C9"], json!("ERROR CREDENTIALS (Meta)"));
    assert_eq!(cells["Shopify Meta!C21"], json!("ERROR CREDENTIALS (Shopify)"));
    assert_eq!(cells["Shopify Meta!C24"], json!("ERROR CREDENTIALS (Shopify)"));
}

#[tokio::test]
async fn test_order_pagination_concatenates_all_pages() {
    let mock = MockServer::start().await;
    let in_window = last_week_start(Tz::UTC);

    mock.set_grid(credential_grid(&[shop_column(&mock, "Acme", "acme", "c1")]));
    mock.insert_campaign(
        "c1",
        CampaignMock {
            spend: Some("1.00".to_string()),
            ..Default::default()
        },
    );
    mock.insert_shop(
        "acme",
        ShopMock {
            timezone: "UTC".to_string(),
            created_pages: vec![
                vec![
                    order(1, "10.00", &in_window),
                    order(2, "10.00", &in_window),
                ],
                vec![order(3, "10.00", &in_window)],
            ],
            ..Default::default()
        },
    );

    let state = state_for(&mock);
    runner::run_report(&state, Mode::LastWeek).await.unwrap();

    let cells = mock.written_cells();
    assert_eq!(cells["Shopify Meta!B21"], json!(30.0));
    assert_eq!(cells["Shopify Meta!B24"], json!(3));
}

#[tokio::test]
async fn test_repeated_pagination_cursor_terminates() {
    let mock = MockServer::start().await;
    let in_window = last_week_start(Tz::UTC);

    mock.set_grid(credential_grid(&[shop_column(&mock, "Acme", "acme", "c1")]));
    mock.insert_campaign(
        "c1",
        CampaignMock {
            spend: Some("1.00".to_string()),
            ..Default::default()
        },
    );
    // Every orders response links back to its own URL, a cursor that never
    // advances.
    mock.insert_shop(
        "acme",
        ShopMock {
            timezone: "UTC".to_string(),
            created_pages: vec![vec![order(1, "10.00", &in_window)]],
            repeat_cursor: true,
            ..Default::default()
        },
    );

    let state = state_for(&mock);
    let summary = runner::run_report(&state, Mode::LastWeek).await.unwrap();
    assert_eq!(summary.cells_written, 3);

    // The page fetched before the cursor repeated is kept; nothing is
    // double-counted and the run does not hang.
    let cells = mock.written_cells();
    assert_eq!(cells["Shopify Meta!B21"], json!(10.0));
    assert_eq!(cells["Shopify Meta!B24"], json!(1));
}

#[tokio::test]
async fn test_writes_above_batch_size_are_chunked() {
    let mock = MockServer::start().await;
    let state = state_for(&mock);

    let cells: Vec<MetricCell> = (1..=60)
        .map(|row| MetricCell {
            column: 2,
            row,
            value: CellValue::Count(u64::from(row)),
        })
        .collect();
    let written = state.sheets().write_cells(&cells).await.unwrap();
    assert_eq!(written, 60);

    // 60 ranges at a chunk size of 50 means exactly two batchUpdate calls.
    assert_eq!(mock.write_batches(), 2);
    let captured = mock.written_cells();
    assert_eq!(captured.len(), 60);
    assert_eq!(captured["Shopify Meta!B1"], json!(1));
    assert_eq!(captured["Shopify Meta!B60"], json!(60));
}

#[tokio::test]
async fn test_rate_limited_calls_are_retried() {
    let mock = MockServer::start().await;
    let in_window = last_week_start(Tz::UTC);

    mock.set_grid(credential_grid(&[shop_column(&mock, "Acme", "acme", "c1")]));
    mock.insert_campaign(
        "c1",
        CampaignMock {
            spend: Some("7.00".to_string()),
            rate_limits: 1,
            ..Default::default()
        },
    );
    mock.insert_shop(
        "acme",
        ShopMock {
            timezone: "UTC".to_string(),
            created_pages: vec![vec![order(1, "12.00", &in_window)]],
            rate_limits: 1,
            ..Default::default()
        },
    );

    let state = state_for(&mock);
    runner::run_report(&state, Mode::LastWeek).await.unwrap();

    let cells = mock.written_cells();
    assert_eq!(cells["Shopify Meta!B9"], json!(7.0));
    assert_eq!(cells["Shopify Meta!B21"], json!(12.0));
    assert_eq!(cells["Shopify Meta!B24"], json!(1));
}

#[tokio::test]
async fn test_current_mode_writes_week_month_and_year_rows() {
    let mock = MockServer::start().await;
    mock.set_grid(credential_grid(&[StoreColumn {
        label: "AdsOnly".to_string(),
        meta_token: "meta-token".to_string(),
        campaign_ids: "c1".to_string(),
        ..Default::default()
    }]));
    mock.insert_campaign(
        "c1",
        CampaignMock {
            spend: Some("3.00".to_string()),
            ..Default::default()
        },
    );

    let state = state_for(&mock);
    let summary = runner::run_report(&state, Mode::Current).await.unwrap();
    assert_eq!(summary.cells_written, 9);

    let cells = mock.written_cells();
    for row in [6, 7, 8] {
        assert_eq!(cells[&format!("Shopify Meta!B{row}")], json!(3.0));
    }
    for row in [15, 16, 17, 18, 19, 20] {
        assert_eq!(
            cells[&format!("Shopify Meta!B{row}")],
            json!("ERROR CREDENTIALS (Shopify)")
        );
    }
}

#[tokio::test]
async fn test_http_surface_modes_and_health() {
    let mock = MockServer::start().await;
    mock.set_grid(credential_grid(&[]));

    let state = state_for(&mock);
    let app = spendsheet_server::app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let base = format!("http://{addr}");
    let client = reqwest::Client::new();

    let health = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    assert_eq!(health.text().await.unwrap(), "ok");

    let bad = client
        .get(format!("{base}/?mode=bogus"))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), 400);

    let default = client.get(&base).send().await.unwrap();
    assert_eq!(default.status(), 200);
    let body = default.text().await.unwrap();
    assert!(body.starts_with("report complete: mode=current"));

    let last_week = client
        .get(format!("{base}/?mode=lastWeek"))
        .send()
        .await
        .unwrap();
    assert_eq!(last_week.status(), 200);
    let body = last_week.text().await.unwrap();
    assert!(body.starts_with("report complete: mode=lastWeek"));
}
