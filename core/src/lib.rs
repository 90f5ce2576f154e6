//! Physician compensation engine.
//!
//! Converts monthly wRVU production and market survey curves into
//! targets, percentile rankings, and incentive/holdback payments.
//!
//! Data flow per provider-year:
//!   adjustment → target → plan → accumulator → ProviderMetric
//!   benchmark  ─────────────┘          │
//!   engine drives the accumulator per provider; store persists results.

pub mod accumulator;
pub mod adjustment;
pub mod benchmark;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod metric;
pub mod plan;
pub mod snapshot;
pub mod store;
pub mod target;
pub mod types;
