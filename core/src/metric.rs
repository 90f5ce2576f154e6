//! Engine output rows and their per-year roll-up.

use crate::{
    snapshot::Provider,
    types::{round_to, Month, ProviderId, Year},
};
use serde::{Deserialize, Serialize};

/// One provider-month of computed compensation metrics.
///
/// Keyed by (provider_id, year, month) and upserted by the host; a
/// re-run over unchanged inputs produces the same row byte for byte.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderMetric {
    pub provider_id: ProviderId,
    pub year: Year,
    pub month: Month,
    pub actual_wrvus: f64,
    pub target_wrvus: f64,
    pub cumulative_actual: f64,
    pub cumulative_target: f64,
    pub productivity_percentile: f64,
    pub compensation_percentile: f64,
    pub incentive: f64,
    pub holdback: f64,
    pub additional_pay: f64,
    pub total_compensation: f64,
    /// Cumulative actual as a percent of cumulative target.
    pub plan_progress: f64,
    pub conversion_factor_used: f64,
}

/// Year-to-date roll-up of one provider's emitted months.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderYearSummary {
    pub provider_id: ProviderId,
    pub year: Year,
    pub through_month: Month,
    pub ytd_actual: f64,
    pub ytd_target: f64,
    pub total_incentive: f64,
    pub total_holdback: f64,
    pub total_additional_pay: f64,
    pub total_compensation: f64,
    pub productivity_percentile: f64,
    pub compensation_percentile: f64,
    pub plan_progress: f64,
    /// Annualized YTD actual minus the contract's annual baseline.
    /// Zero when the provider has no baseline on file.
    pub baseline_variance: f64,
}

impl ProviderYearSummary {
    /// `None` when no months were emitted.
    pub fn from_metrics(provider: &Provider, metrics: &[ProviderMetric], places: u32) -> Option<Self> {
        let last = metrics.last()?;
        let sum = |f: fn(&ProviderMetric) -> f64| round_to(metrics.iter().map(f).sum(), places);

        let baseline_variance = if provider.target_wrvus > 0.0 {
            let annualized = last.cumulative_actual / last.month as f64 * 12.0;
            round_to(annualized - provider.target_wrvus, places)
        } else {
            0.0
        };

        Some(Self {
            provider_id: last.provider_id.clone(),
            year: last.year,
            through_month: last.month,
            ytd_actual: last.cumulative_actual,
            ytd_target: last.cumulative_target,
            total_incentive: sum(|m| m.incentive),
            total_holdback: sum(|m| m.holdback),
            total_additional_pay: sum(|m| m.additional_pay),
            total_compensation: sum(|m| m.total_compensation),
            productivity_percentile: last.productivity_percentile,
            compensation_percentile: last.compensation_percentile,
            plan_progress: last.plan_progress,
            baseline_variance,
        })
    }
}
