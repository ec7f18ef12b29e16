//! Metric cells and A1-notation addressing.

use rust_decimal::Decimal;
use serde_json::Value;

/// A value destined for one spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    /// A monetary amount, already rounded to 2 decimal places.
    Number(Decimal),
    /// An integer count (order counts).
    Count(u64),
    /// An error sentinel written in place of a numeric result.
    Text(String),
}

impl CellValue {
    /// The JSON value sent to the sheet (`valueInputOption: RAW`).
    ///
    /// Numbers are written as JSON numbers so the sheet treats them as
    /// numeric, not text.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(amount) => amount
                .to_string()
                .parse::<serde_json::Number>()
                .map_or_else(|_| Value::String(amount.to_string()), Value::Number),
            Self::Count(n) => Value::from(*n),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

/// One computed metric addressed to a `(column, row)` slot.
///
/// `column` and `row` are both 1-indexed, matching A1 notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricCell {
    pub column: u32,
    pub row: u32,
    pub value: CellValue,
}

impl MetricCell {
    /// Render the A1 range for this cell, e.g. `Shopify Meta!C7`.
    #[must_use]
    pub fn range(&self, sheet_name: &str) -> String {
        format!("{sheet_name}!{}{}", column_label(self.column), self.row)
    }
}

/// Convert a 1-indexed column number to its spreadsheet letter label.
///
/// Base-26 with no zero digit: 1 -> `A`, 26 -> `Z`, 27 -> `AA`, 703 -> `AAA`.
/// Returns an empty string for 0, which is never a valid column.
#[must_use]
pub fn column_label(index: u32) -> String {
    let mut col = index;
    let mut label = String::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        label.insert(0, char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        col = (col - rem - 1) / 26;
    }
    label
}
