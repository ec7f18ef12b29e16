//! Remote API clients and shared retry policy.

pub mod backoff;
pub mod meta;
pub mod sheets;
pub mod shopify;
