//! Google Sheets values client.
//!
//! The sheet is treated as a key-value store addressed by A1 ranges: one
//! ranged read for the credential block, one chunked `values:batchUpdate`
//! phase for all computed cells. Sheet failures are fatal for the run.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use spendsheet_core::{MetricCell, column_label, layout::rows};

/// Maximum ranges per `values:batchUpdate` call.
pub const WRITE_BATCH_SIZE: usize = 50;

/// Errors from the Sheets API.
#[derive(Debug, Error)]
pub enum SheetsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success response.
    #[error("API error: {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body or URL was unparseable.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// The credential block of the sheet, read once per run.
///
/// Rows and columns are 1-indexed to match A1 notation. The column count
/// comes from the header row, which spans every configured store.
#[derive(Debug, Default)]
pub struct SheetGrid {
    column_count: u32,
    values: Vec<Vec<String>>,
}

impl SheetGrid {
    fn from_values(column_count: u32, values: Vec<Vec<serde_json::Value>>) -> Self {
        let values = values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Number(n) => n.to_string(),
                        serde_json::Value::Bool(b) => b.to_string(),
                        _ => String::new(),
                    })
                    .collect()
            })
            .collect();
        Self {
            column_count,
            values,
        }
    }

    /// Number of columns in the header row (column 1 is the label column).
    #[must_use]
    pub const fn column_count(&self) -> u32 {
        self.column_count
    }

    /// The cell at 1-indexed `(row, column)`, `None` when absent or empty.
    #[must_use]
    pub fn cell(&self, row: u32, column: u32) -> Option<&str> {
        self.values
            .get(row.checked_sub(1)? as usize)?
            .get(column.checked_sub(1)? as usize)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Google Sheets API client scoped to one spreadsheet and tab.
#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    sheet_id: String,
    sheet_name: String,
    token: SecretString,
}

impl std::fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsClient")
            .field("sheet_id", &self.sheet_id)
            .field("sheet_name", &self.sheet_name)
            .finish_non_exhaustive()
    }
}

impl SheetsClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        sheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        token: SecretString,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            sheet_id: sheet_id.into(),
            sheet_name: sheet_name.into(),
            token,
        }
    }

    /// The tab name metric ranges are addressed against.
    #[must_use]
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Read the header row and credential block.
    ///
    /// The header row (`A1:1`) determines how many columns the run covers;
    /// the block read then spans rows 1 through the last credential row.
    ///
    /// # Errors
    ///
    /// Any read failure is returned as-is; the caller treats it as fatal.
    pub async fn read_credential_grid(&self) -> Result<SheetGrid, SheetsError> {
        let header = self
            .get_range(&format!("{}!A1:1", self.sheet_name))
            .await?;
        let column_count = header.values.first().map_or(0, Vec::len);
        let Ok(column_count) = u32::try_from(column_count) else {
            return Err(SheetsError::Parse("header row too wide".to_string()));
        };
        if column_count == 0 {
            return Ok(SheetGrid::default());
        }

        let end = column_label(column_count);
        let block = self
            .get_range(&format!("{}!A1:{end}{}", self.sheet_name, rows::BLOCK_END))
            .await?;
        Ok(SheetGrid::from_values(column_count, block.values))
    }

    /// Write all computed cells in chunks of [`WRITE_BATCH_SIZE`].
    ///
    /// # Errors
    ///
    /// The first failed batch aborts the write phase; the caller treats it
    /// as fatal for the run.
    pub async fn write_cells(&self, cells: &[MetricCell]) -> Result<usize, SheetsError> {
        if cells.is_empty() {
            return Ok(0);
        }

        let url = self.url(&["values:batchUpdate"])?;
        let mut written = 0;
        for chunk in cells.chunks(WRITE_BATCH_SIZE) {
            let data: Vec<serde_json::Value> = chunk
                .iter()
                .map(|cell| {
                    serde_json::json!({
                        "range": cell.range(&self.sheet_name),
                        "values": [[cell.value.to_json()]],
                    })
                })
                .collect();
            let body = serde_json::json!({
                "valueInputOption": "RAW",
                "data": data,
            });

            let response = self
                .http
                .post(url.clone())
                .bearer_auth(self.token.expose_secret())
                .json(&body)
                .send()
                .await?;
            let _: serde_json::Value = Self::handle_response(response).await?;
            written += chunk.len();
        }

        tracing::info!(cells = written, "sheet write phase complete");
        Ok(written)
    }

    async fn get_range(&self, range: &str) -> Result<ValueRange, SheetsError> {
        let url = self.url(&["values", range])?;
        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SheetsError::Parse(format!("sheets base url: {e}")))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| SheetsError::Parse("sheets base url cannot be a base".to_string()))?;
            path.pop_if_empty().push(&self.sheet_id);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SheetsError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| SheetsError::Parse(format!("response body: {e}")))
    }
}
