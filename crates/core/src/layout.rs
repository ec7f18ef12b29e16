//! Mode-dependent sheet row layouts and fixed credential rows.
//!
//! The sheet template is external configuration: fixed header rows hold
//! per-column credentials, and fixed metric rows receive computed values.
//! Row numbers are reproduced here verbatim as data and validated at
//! startup; they are never computed inline.

use thiserror::Error;

use crate::period::{Mode, Period};

/// Fixed 1-indexed credential rows of the sheet template.
pub mod rows {
    /// Meta ad account id.
    pub const AD_ACCOUNT_ID: u32 = 3;
    /// Meta access token.
    pub const META_TOKEN: u32 = 4;
    /// Comma-separated Meta campaign ids.
    pub const CAMPAIGN_IDS: u32 = 5;
    /// Shopify Admin API access token.
    pub const SHOPIFY_TOKEN: u32 = 12;
    /// Shopify shop URL (scheme + host).
    pub const SHOP_URL: u32 = 13;
    /// Shopify API version (e.g. `2024-04`).
    pub const API_VERSION: u32 = 14;
    /// Last row of the credential block; reads cover `A1:{end}{BLOCK_END}`.
    pub const BLOCK_END: u32 = 14;
}

/// The three metrics written per column and period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    AdSpend,
    Sales,
    Orders,
}

impl Metric {
    /// All metrics, in the order they are written per period.
    pub const ALL: [Self; 3] = [Self::AdSpend, Self::Sales, Self::Orders];
}

/// The four row layouts, one per mode, as flat configuration data.
///
/// The `current` layout matches the original sheet template; the three
/// past-mode layouts continue the same blocks with one row per mode.
const ROW_TABLE: &[(Mode, Metric, Period, u32)] = &[
    // mode=current: week/month/year blocks
    (Mode::Current, Metric::AdSpend, Period::Week, 6),
    (Mode::Current, Metric::AdSpend, Period::Month, 7),
    (Mode::Current, Metric::AdSpend, Period::Year, 8),
    (Mode::Current, Metric::Sales, Period::Week, 15),
    (Mode::Current, Metric::Sales, Period::Month, 16),
    (Mode::Current, Metric::Sales, Period::Year, 17),
    (Mode::Current, Metric::Orders, Period::Week, 18),
    (Mode::Current, Metric::Orders, Period::Month, 19),
    (Mode::Current, Metric::Orders, Period::Year, 20),
    // single-past-period modes
    (Mode::LastWeek, Metric::AdSpend, Period::LastWeek, 9),
    (Mode::LastMonth, Metric::AdSpend, Period::LastMonth, 10),
    (Mode::LastYear, Metric::AdSpend, Period::LastYear, 11),
    (Mode::LastWeek, Metric::Sales, Period::LastWeek, 21),
    (Mode::LastMonth, Metric::Sales, Period::LastMonth, 22),
    (Mode::LastYear, Metric::Sales, Period::LastYear, 23),
    (Mode::LastWeek, Metric::Orders, Period::LastWeek, 24),
    (Mode::LastMonth, Metric::Orders, Period::LastMonth, 25),
    (Mode::LastYear, Metric::Orders, Period::LastYear, 26),
];

/// Look up the target row for a metric in a given mode and period.
///
/// Returns `None` for combinations outside the mode's layout (e.g.
/// `Period::Week` under `Mode::LastMonth`).
#[must_use]
pub fn metric_row(mode: Mode, metric: Metric, period: Period) -> Option<u32> {
    ROW_TABLE
        .iter()
        .find(|(m, me, p, _)| *m == mode && *me == metric && *p == period)
        .map(|(_, _, _, row)| *row)
}

/// Row layout validation failure.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("row layout missing entry for mode={mode} metric={metric:?} period={period:?}")]
    MissingEntry {
        mode: Mode,
        metric: Metric,
        period: Period,
    },
    #[error("row layout assigns row {row} more than once")]
    DuplicateRow { row: u32 },
    #[error("row layout assigns metric row {row} inside the credential block")]
    CredentialOverlap { row: u32 },
}

/// Validate the row table at startup.
///
/// Checks that every mode covers all of its periods for all three metrics,
/// that no row number is assigned twice, and that no metric row collides
/// with the credential block.
///
/// # Errors
///
/// Returns the first violation found; the table is compile-time constant,
/// so any error here is a template bug.
pub fn validate() -> Result<(), LayoutError> {
    for mode in [Mode::Current, Mode::LastWeek, Mode::LastMonth, Mode::LastYear] {
        for period in mode.periods() {
            for metric in Metric::ALL {
                if metric_row(mode, metric, *period).is_none() {
                    return Err(LayoutError::MissingEntry {
                        mode,
                        metric,
                        period: *period,
                    });
                }
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    for (_, _, _, row) in ROW_TABLE {
        if !seen.insert(*row) {
            return Err(LayoutError::DuplicateRow { row: *row });
        }
        if (1..=rows::BLOCK_END).contains(row)
            && matches!(
                *row,
                rows::AD_ACCOUNT_ID
                    | rows::META_TOKEN
                    | rows::CAMPAIGN_IDS
                    | rows::SHOPIFY_TOKEN
                    | rows::SHOP_URL
                    | rows::API_VERSION
            )
        {
            return Err(LayoutError::CredentialOverlap { row: *row });
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_table_validates() {
        validate().unwrap();
    }

    #[test]
    fn test_current_layout_matches_template() {
        assert_eq!(metric_row(Mode::Current, Metric::AdSpend, Period::Week), Some(6));
        assert_eq!(metric_row(Mode::Current, Metric::AdSpend, Period::Month), Some(7));
        assert_eq!(metric_row(Mode::Current, Metric::AdSpend, Period::Year), Some(8));
        assert_eq!(metric_row(Mode::Current, Metric::Sales, Period::Week), Some(15));
        assert_eq!(metric_row(Mode::Current, Metric::Orders, Period::Year), Some(20));
    }

    #[test]
    fn test_past_mode_layouts() {
        assert_eq!(
            metric_row(Mode::LastWeek, Metric::AdSpend, Period::LastWeek),
            Some(9)
        );
        assert_eq!(
            metric_row(Mode::LastMonth, Metric::Sales, Period::LastMonth),
            Some(22)
        );
        assert_eq!(
            metric_row(Mode::LastYear, Metric::Orders, Period::LastYear),
            Some(26)
        );
    }

    #[test]
    fn test_cross_mode_lookup_is_none() {
        assert_eq!(metric_row(Mode::LastMonth, Metric::Sales, Period::Week), None);
        assert_eq!(metric_row(Mode::Current, Metric::AdSpend, Period::LastYear), None);
    }

    #[test]
    fn test_metric_rows_clear_of_credential_block() {
        for (_, _, _, row) in ROW_TABLE {
            assert!(
                *row > rows::CAMPAIGN_IDS,
                "metric row {row} collides with Meta credential rows"
            );
        }
    }
}
