//! HTTP route handlers.
//!
//! ```text
//! GET  /         - Run one report (query: mode=current|lastWeek|lastMonth|lastYear)
//! GET  /healthz  - Liveness check
//! ```

use axum::extract::{Query, State};
use axum::{Router, routing::get};
use serde::Deserialize;

use spendsheet_core::Mode;

use crate::error::AppError;
use crate::report::runner;
use crate::state::AppState;

/// Build the route table.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(run))
        .route("/healthz", get(healthz))
}

#[derive(Debug, Deserialize)]
struct RunQuery {
    mode: Option<String>,
}

/// Trigger one full report run and return a plaintext summary.
async fn run(
    State(state): State<AppState>,
    Query(query): Query<RunQuery>,
) -> Result<String, AppError> {
    let mode = query
        .mode
        .as_deref()
        .map(Mode::parse)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?
        .unwrap_or(Mode::Current);

    let summary = runner::run_report(&state, mode).await?;
    tracing::info!(%summary, "run finished");
    Ok(summary.to_string())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn healthz() -> &'static str {
    "ok"
}
