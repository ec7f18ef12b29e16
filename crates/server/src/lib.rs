//! Spendsheet server library.
//!
//! Exposes the router, configuration, clients, and report pipeline so the
//! binary and the integration-test crate share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod report;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Build the application router (no middleware layers).
///
/// The binary wraps this with trace and Sentry layers; tests drive it
/// directly.
#[must_use]
pub fn app(state: AppState) -> Router {
    Router::new().merge(routes::routes()).with_state(state)
}
