//! Batch events, the record of what a calculation pass did.
//!
//! Events are collected in order while the batch runs and persisted
//! with the run so the host can show why a provider has no metrics.

use crate::{
    engine::IssueKind,
    types::{Month, ProviderId, RunId, Year},
};
use serde::{Deserialize, Serialize};

/// Variants are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalcEvent {
    BatchStarted {
        run_id: RunId,
        year: Year,
        through_month: Month,
        providers: usize,
    },
    BenchmarkFallbackApplied {
        provider_id: ProviderId,
        specialty: String,
        fallback_rate: f64,
    },
    ProviderYearComputed {
        provider_id: ProviderId,
        year: Year,
        months: usize,
        ytd_actual: f64,
        ytd_target: f64,
        total_incentive: f64,
    },
    ProviderSkipped {
        provider_id: ProviderId,
        kind: IssueKind,
        reason: String,
    },
    BatchCompleted {
        run_id: RunId,
        computed: usize,
        skipped: usize,
    },
}

impl CalcEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            CalcEvent::BatchStarted { .. }             => "batch_started",
            CalcEvent::BenchmarkFallbackApplied { .. } => "benchmark_fallback_applied",
            CalcEvent::ProviderYearComputed { .. }     => "provider_year_computed",
            CalcEvent::ProviderSkipped { .. }          => "provider_skipped",
            CalcEvent::BatchCompleted { .. }           => "batch_completed",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub seq: u64,
    pub event_type: String,
    pub payload: String, // JSON-serialized CalcEvent
}
