//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::sheets::SheetsError;

/// Application-level error type for report runs.
#[derive(Debug, Error)]
pub enum AppError {
    /// Spreadsheet read or write failed; fatal for the whole run.
    #[error("Sheets error: {0}")]
    Sheets(#[from] SheetsError),

    /// The run exceeded the configured deadline.
    #[error("report deadline exceeded")]
    DeadlineExceeded,

    /// Bad request from client (unknown mode).
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Sheets(_) | Self::DeadlineExceeded) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Report run failed"
            );
        }

        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Sheets(_) | Self::DeadlineExceeded => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // A failed run is actionable for the operator, so the message goes
        // in the body (the caller is internal tooling, not end users).
        (status, self.to_string()).into_response()
    }
}
