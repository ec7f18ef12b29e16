//! Per-run orchestration: credential read, bounded column fan-out, and the
//! single deferred write phase.

use chrono::Utc;
use chrono_tz::Tz;
use futures::StreamExt;
use rust_decimal::Decimal;
use tracing::instrument;

use spendsheet_core::{
    CellValue, ColumnCredentials, DateRange, Metric, MetricCell, Mode, Period, ShopifyCredentials,
    metric_row,
};

use crate::error::AppError;
use crate::report::{MISSING_META_CREDENTIALS, MISSING_SHOPIFY_CREDENTIALS, RunSummary, aggregate};
use crate::services::shopify::{OrderWindow, ShopifyError};
use crate::state::AppState;

/// Run one full report under the configured deadline.
///
/// # Errors
///
/// Fatal failures only: sheet read/write errors and the deadline. Remote
/// API failures never bubble up here; they land in cells as sentinels.
pub async fn run_report(state: &AppState, mode: Mode) -> Result<RunSummary, AppError> {
    let deadline = state.config().request_deadline;
    (tokio::time::timeout(deadline, run_inner(state, mode)).await)
        .map_err(|_| AppError::DeadlineExceeded)?
}

#[instrument(skip(state), fields(mode = %mode))]
async fn run_inner(state: &AppState, mode: Mode) -> Result<RunSummary, AppError> {
    let started = std::time::Instant::now();

    let grid = state.sheets().read_credential_grid().await?;
    let column_count = grid.column_count();
    // Column 1 is the label column; data columns start at 2.
    let columns: Vec<ColumnCredentials> = (2..=column_count)
        .map(|col| ColumnCredentials::from_lookup(col, |row| grid.cell(row, col)))
        .collect();
    tracing::info!(columns = columns.len(), "starting report run");

    let concurrency = state.config().column_concurrency;
    // Futures are inert until polled; collecting them eagerly sidesteps a
    // rustc "FnOnce is not general enough" limitation with lazy map closures
    // that borrow their argument (rust-lang/rust#89976).
    let column_futures: Vec<_> = columns
        .iter()
        .map(|creds| process_column(state, mode, creds))
        .collect();
    let per_column: Vec<Vec<MetricCell>> = futures::stream::iter(column_futures)
        .buffered(concurrency)
        .collect()
        .await;

    let cells: Vec<MetricCell> = per_column.into_iter().flatten().collect();
    let cells_written = state.sheets().write_cells(&cells).await?;

    Ok(RunSummary {
        mode,
        columns: columns.len(),
        cells_written,
        elapsed: started.elapsed(),
    })
}

/// Aggregate one column: every period's ad-spend, sales, and orders cells.
///
/// Never fails; each integration failure becomes a sentinel in its own
/// cells and the rest of the column still completes.
async fn process_column(state: &AppState, mode: Mode, creds: &ColumnCredentials) -> Vec<MetricCell> {
    // Timezone policy: the store's IANA zone when Shopify credentials
    // exist; Meta-only columns have no store to ask and use UTC.
    let (tz, tz_sentinel) = match &creds.shopify {
        Some(shopify) => match state.shopify().shop_timezone(shopify).await {
            Ok(tz) => (tz, None),
            Err(e) => {
                tracing::warn!(column = creds.column, error = %e, "store timezone lookup failed");
                (Tz::UTC, Some(e.sentinel()))
            }
        },
        None => (Tz::UTC, None),
    };
    let today = Utc::now().with_timezone(&tz).date_naive();

    let mut cells = Vec::new();
    for period in mode.periods() {
        let range = period.resolve(today);
        cells.extend(meta_cell(state, mode, *period, &range, creds).await);
        cells.extend(
            shopify_cells(state, mode, *period, &range, tz, tz_sentinel.as_deref(), creds).await,
        );
    }
    cells
}

async fn meta_cell(
    state: &AppState,
    mode: Mode,
    period: Period,
    range: &DateRange,
    creds: &ColumnCredentials,
) -> Option<MetricCell> {
    let row = metric_row(mode, Metric::AdSpend, period)?;
    let value = match &creds.meta {
        None => CellValue::Text(MISSING_META_CREDENTIALS.to_string()),
        Some(meta) => match state.meta().total_spend(meta, range).await {
            Ok(total) => CellValue::Number(total),
            Err(e) => {
                tracing::warn!(
                    column = creds.column,
                    period = ?period,
                    error = %e,
                    "ad spend aggregation failed"
                );
                CellValue::Text(e.sentinel())
            }
        },
    };
    Some(MetricCell {
        column: creds.column,
        row,
        value,
    })
}

async fn shopify_cells(
    state: &AppState,
    mode: Mode,
    period: Period,
    range: &DateRange,
    tz: Tz,
    tz_sentinel: Option<&str>,
    creds: &ColumnCredentials,
) -> Vec<MetricCell> {
    let (Some(sales_row), Some(orders_row)) = (
        metric_row(mode, Metric::Sales, period),
        metric_row(mode, Metric::Orders, period),
    ) else {
        return Vec::new();
    };

    let (sales, orders) = match (&creds.shopify, tz_sentinel) {
        (None, _) => (
            CellValue::Text(MISSING_SHOPIFY_CREDENTIALS.to_string()),
            CellValue::Text(MISSING_SHOPIFY_CREDENTIALS.to_string()),
        ),
        // The timezone fetch already failed; both cells carry its sentinel.
        (Some(_), Some(sentinel)) => (
            CellValue::Text(sentinel.to_string()),
            CellValue::Text(sentinel.to_string()),
        ),
        (Some(shopify), None) => match column_sales(state, shopify, range, tz).await {
            Ok((net, count)) => (CellValue::Number(net), CellValue::Count(count)),
            Err(e) => {
                tracing::warn!(
                    column = creds.column,
                    period = ?period,
                    error = %e,
                    "sales aggregation failed"
                );
                (
                    CellValue::Text(e.sentinel()),
                    CellValue::Text(e.sentinel()),
                )
            }
        },
    };

    vec![
        MetricCell {
            column: creds.column,
            row: sales_row,
            value: sales,
        },
        MetricCell {
            column: creds.column,
            row: orders_row,
            value: orders,
        },
    ]
}

/// Net sales and order count for one store and period.
///
/// Pass A (created in window) feeds gross sales and the count; Pass B
/// (updated in window) feeds refund reconciliation. Either pass failing
/// aborts both cells.
async fn column_sales(
    state: &AppState,
    creds: &ShopifyCredentials,
    range: &DateRange,
    tz: Tz,
) -> Result<(Decimal, u64), ShopifyError> {
    let start = range.start_timestamp(tz);
    let end = range.end_timestamp(tz);

    let created = state
        .shopify()
        .orders_in_window(creds, OrderWindow::Created, &start, &end)
        .await?;
    let updated = state
        .shopify()
        .orders_in_window(creds, OrderWindow::Updated, &start, &end)
        .await?;

    let gross = aggregate::gross_sales(&created);
    let count = aggregate::order_count(&created);
    let refunds =
        aggregate::refund_total(&updated, range.start_instant(tz), range.end_instant(tz));

    Ok((aggregate::net_sales(gross, refunds), count))
}
