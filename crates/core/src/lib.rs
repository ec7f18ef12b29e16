//! Spendsheet Core - shared types and arithmetic.
//!
//! This crate provides the pure building blocks used by the server:
//! calendar period resolution, money rounding, spreadsheet cell addressing,
//! the mode-dependent row layout tables, and the per-column credential model.
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Everything here is deterministic and directly unit-testable.
//!
//! # Modules
//!
//! - [`period`] - Named calendar windows and timezone-aware date ranges
//! - [`money`] - Decimal rounding for monetary outputs
//! - [`cell`] - Metric cells and A1-notation column addressing
//! - [`layout`] - Mode-dependent `(metric, period) -> row` tables
//! - [`credentials`] - Per-column advertiser/storefront credentials

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cell;
pub mod credentials;
pub mod layout;
pub mod money;
pub mod period;

pub use cell::{CellValue, MetricCell, column_label};
pub use credentials::{ColumnCredentials, MetaCredentials, ShopifyCredentials};
pub use layout::{LayoutError, Metric, metric_row};
pub use money::round_money;
pub use period::{DateRange, Mode, ModeParseError, Period};
