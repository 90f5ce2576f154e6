//! Month-by-month accumulation of one provider-year.
//!
//! ORDER (fixed): months run 1 → through_month, one at a time. Each
//! month's cumulative figures depend on the month before, so this loop
//! is never split or parallelized.
//!
//! Annualized compensation for the percentile lookup uses cumulative
//! YTD compensation, not the latest month times twelve.

use crate::{
    adjustment::{sum_for_period, Adjustment, AdjustmentKind, MonthFilter},
    benchmark::{percentile_of, MarketBenchmark},
    config::EngineConfig,
    error::{CompError, CompResult},
    metric::{ProviderMetric, ProviderYearSummary},
    plan::{resolve_holdback_percent, PlanContext, PlanRates},
    snapshot::{MonthlyWrvus, OrganizationSettings, Provider},
    target::{resolve_conversion_factor, ConversionFactor, TargetCalculator},
    types::{check_month, round_to, Month, Year, MONTHS_PER_YEAR},
};
use serde::{Deserialize, Serialize};

/// Everything needed to compute one provider-year, borrowed from a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ProviderYearInput<'a> {
    pub provider: &'a Provider,
    pub year: Year,
    pub actuals: MonthlyWrvus,
    /// May hold other providers' or years' entries; they are filtered out.
    pub adjustments: &'a [Adjustment],
    pub benchmark: Option<&'a MarketBenchmark>,
    pub settings: &'a OrganizationSettings,
}

/// A month that was emitted but had a lookup degraded to 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthIssue {
    pub month: Month,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderYearOutcome {
    pub metrics: Vec<ProviderMetric>,
    pub summary: Option<ProviderYearSummary>,
    pub conversion_factor: ConversionFactor,
    pub holdback_percent: f64,
    pub issues: Vec<MonthIssue>,
}

pub struct MetricsAccumulator<'a> {
    config: &'a EngineConfig,
}

impl<'a> MetricsAccumulator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Compute months 1..=through_month for one provider-year.
    ///
    /// Fails with `InvalidInput` when the provider cannot have a target
    /// (non-positive salary, rate, or clinical FTE) or when any wRVU or
    /// adjustment value is not finite; the caller skips the provider for
    /// this pass.
    pub fn run(&self, input: &ProviderYearInput<'_>, through_month: Month) -> CompResult<ProviderYearOutcome> {
        let through_month = check_month(through_month)?;
        let provider = input.provider;
        let pid = provider.provider_id.as_str();
        let year = input.year;
        let places = self.config.rounding_places;
        let round = |v: f64| round_to(v, places);

        let conversion_factor =
            resolve_conversion_factor(input.benchmark, self.config.fallback_conversion_factor);
        let targets = TargetCalculator::for_provider(provider, conversion_factor.rate)?;
        let rates = PlanRates::from_benchmark(input.benchmark, conversion_factor);
        let holdback_percent = resolve_holdback_percent(
            provider.holdback_percent,
            input.settings.default_holdback_percent,
            self.config.hard_default_holdback_percent,
        );
        let ctx = PlanContext {
            rates: &rates,
            thresholds: &self.config.tier_thresholds,
            holdback_percent,
        };

        let wrvu_curve = input.benchmark.map(|b| &b.wrvus);
        let comp_curve = input.benchmark.map(|b| &b.total_comp);
        let monthly_salary = provider.base_salary / MONTHS_PER_YEAR as f64;
        let clinical_divisor = fte_divisor(provider.clinical_fte);
        let comp_divisor = fte_divisor(provider.fte);

        let mut metrics = Vec::with_capacity(through_month as usize);
        let mut issues = Vec::new();
        let mut cumulative_actual = 0.0;
        let mut cumulative_target = 0.0;
        let mut cumulative_comp = 0.0;

        for month in 1..=through_month {
            let exact = MonthFilter::Exact(month);
            let elapsed = month as f64;

            let raw = CompError::require_finite("wrvus", input.actuals.get(month))?;
            let productivity_adj = CompError::require_finite(
                "productivity adjustment",
                sum_for_period(input.adjustments, AdjustmentKind::Productivity, pid, year, exact),
            )?;
            let actual = round(raw + productivity_adj);
            cumulative_actual = round(cumulative_actual + actual);

            let target = round(CompError::require_finite(
                "target",
                targets.monthly_target_adjusted(input.adjustments, pid, year, month)?,
            )?);
            cumulative_target = round(cumulative_target + target);

            let annualized_actual = cumulative_actual / elapsed * 12.0 / clinical_divisor;
            let productivity_percentile = match percentile_of(annualized_actual, wrvu_curve) {
                Ok(p) => p,
                Err(e) => {
                    issues.push(MonthIssue { month, reason: format!("productivity percentile: {e}") });
                    0.0
                }
            };

            let outcome = provider
                .compensation_model
                .compute(actual, target, productivity_percentile, &ctx);
            let incentive = round(outcome.incentive);
            let holdback = round(outcome.holdback).min(incentive);

            let additional_pay = round(CompError::require_finite(
                "additional pay",
                sum_for_period(input.adjustments, AdjustmentKind::AdditionalPay, pid, year, exact),
            )?);
            let total_compensation = round(monthly_salary + incentive - holdback + additional_pay);
            cumulative_comp = round(cumulative_comp + total_compensation);

            let annualized_comp = cumulative_comp / elapsed * 12.0 / comp_divisor;
            let compensation_percentile = match percentile_of(annualized_comp, comp_curve) {
                Ok(p) => p,
                Err(e) => {
                    issues.push(MonthIssue { month, reason: format!("compensation percentile: {e}") });
                    0.0
                }
            };

            let plan_progress = if cumulative_target > 0.0 {
                cumulative_actual / cumulative_target * 100.0
            } else {
                0.0
            };

            metrics.push(ProviderMetric {
                provider_id: provider.provider_id.clone(),
                year,
                month,
                actual_wrvus: actual,
                target_wrvus: target,
                cumulative_actual,
                cumulative_target,
                productivity_percentile: round(productivity_percentile),
                compensation_percentile: round(compensation_percentile),
                incentive,
                holdback,
                additional_pay,
                total_compensation,
                plan_progress: round(plan_progress),
                conversion_factor_used: round(outcome.conversion_factor_used),
            });
        }

        log::debug!(
            "{pid}/{year}: {} months, cf={:.2} ({:?}), ytd actual={cumulative_actual} target={cumulative_target}",
            metrics.len(),
            conversion_factor.rate,
            conversion_factor.source,
        );

        let summary = ProviderYearSummary::from_metrics(provider, &metrics, places);
        Ok(ProviderYearOutcome {
            metrics,
            summary,
            conversion_factor,
            holdback_percent,
            issues,
        })
    }
}

/// Part-time providers are scaled up to a full-time equivalent before
/// ranking; anything at or above 1.0 (or unusable) is left alone.
fn fte_divisor(fte: f64) -> f64 {
    if fte.is_finite() && fte > 0.0 && fte < 1.0 {
        fte
    } else {
        1.0
    }
}
