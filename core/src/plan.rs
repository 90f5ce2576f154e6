//! Compensation plans: turning wRVU variance into incentive and holdback.
//!
//! The set of plans is closed. Each provider carries one variant and
//! every calculation dispatches on it with a match.

use crate::{
    benchmark::MarketBenchmark,
    config::TierThresholds,
    target::ConversionFactor,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CompensationPlan {
    /// Salary only. Never earns incentive.
    BasePay,
    /// Flat $/wRVU above target at the specialty median rate.
    Standard,
    /// $/wRVU above target at a rate picked by the provider's own
    /// productivity percentile.
    TieredRate,
}

impl CompensationPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BasePay    => "base_pay",
            Self::Standard   => "standard",
            Self::TieredRate => "tiered_rate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [Self::BasePay, Self::Standard, Self::TieredRate]
            .into_iter()
            .find(|p| p.as_str() == s)
    }

    /// $/wRVU this plan pays on variance for the period.
    pub fn rate_for(
        &self,
        rates: &PlanRates,
        productivity_percentile: f64,
        thresholds: &TierThresholds,
    ) -> f64 {
        match self {
            Self::BasePay    => 0.0,
            Self::Standard   => rates.p50,
            Self::TieredRate => rates.tier_rate(productivity_percentile, thresholds),
        }
    }

    pub fn incentive(&self, actual: f64, target: f64, rate: f64) -> f64 {
        match self {
            Self::BasePay => 0.0,
            Self::Standard | Self::TieredRate => variance_incentive(actual, target, rate),
        }
    }

    pub fn holdback(&self, incentive: f64, holdback_percent: f64) -> f64 {
        match self {
            Self::BasePay => 0.0,
            Self::Standard | Self::TieredRate => holdback_amount(incentive, holdback_percent),
        }
    }

    /// Incentive and holdback for one period.
    pub fn compute(
        &self,
        actual: f64,
        target: f64,
        productivity_percentile: f64,
        ctx: &PlanContext<'_>,
    ) -> PlanOutcome {
        let rate = self.rate_for(ctx.rates, productivity_percentile, ctx.thresholds);
        let incentive = self.incentive(actual, target, rate);
        let holdback = self.holdback(incentive, ctx.holdback_percent);
        PlanOutcome { incentive, holdback, conversion_factor_used: rate }
    }
}

/// Everything a plan needs besides the period's actual and target.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub rates: &'a PlanRates,
    pub thresholds: &'a TierThresholds,
    pub holdback_percent: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanOutcome {
    pub incentive: f64,
    pub holdback: f64,
    pub conversion_factor_used: f64,
}

impl PlanOutcome {
    /// Incentive actually paid out this period.
    pub fn net_incentive(&self) -> f64 {
        self.incentive - self.holdback
    }
}

/// Tier rates ($/wRVU) for one specialty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlanRates {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl PlanRates {
    pub fn flat(rate: f64) -> Self {
        Self { p25: rate, p50: rate, p75: rate, p90: rate }
    }

    /// Tiers from the specialty's conversion-factor curve.
    ///
    /// p50 is always the resolved median rate; any other tier the survey
    /// leaves blank (≤ 0) falls back to it. No row means a flat curve at
    /// the resolved rate.
    pub fn from_benchmark(benchmark: Option<&MarketBenchmark>, median: ConversionFactor) -> Self {
        let Some(curve) = benchmark.map(|b| b.conversion_factor) else {
            return Self::flat(median.rate);
        };
        let or_median = |v: f64| if v.is_finite() && v > 0.0 { v } else { median.rate };
        Self {
            p25: or_median(curve.p25),
            p50: median.rate,
            p75: or_median(curve.p75),
            p90: or_median(curve.p90),
        }
    }

    /// Rate for the highest tier whose threshold `percentile` reaches.
    /// Below the lowest tier the median rate applies.
    pub fn tier_rate(&self, percentile: f64, thresholds: &TierThresholds) -> f64 {
        if percentile >= thresholds.p90 {
            self.p90
        } else if percentile >= thresholds.p75 {
            self.p75
        } else if percentile >= thresholds.p50 {
            self.p50
        } else if percentile >= thresholds.p25 {
            self.p25
        } else {
            self.p50
        }
    }
}

/// `(actual - target) * rate` when positive, otherwise 0.
pub fn variance_incentive(actual: f64, target: f64, rate: f64) -> f64 {
    let variance = actual - target;
    if variance > 0.0 && rate > 0.0 {
        variance * rate
    } else {
        0.0
    }
}

/// Share of `incentive` withheld; never negative, never above the incentive.
pub fn holdback_amount(incentive: f64, holdback_percent: f64) -> f64 {
    if incentive <= 0.0 {
        return 0.0;
    }
    let percent = holdback_percent.clamp(0.0, 100.0);
    (incentive * percent / 100.0).clamp(0.0, incentive)
}

/// Provider override, then organization default, then the hard default.
/// Non-finite candidates are skipped; the chosen value is clamped to 0..=100.
pub fn resolve_holdback_percent(
    provider_override: Option<f64>,
    organization_default: Option<f64>,
    hard_default: f64,
) -> f64 {
    provider_override
        .filter(|p| p.is_finite())
        .or_else(|| organization_default.filter(|p| p.is_finite()))
        .unwrap_or(hard_default)
        .clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_tags_round_trip() {
        for plan in [CompensationPlan::BasePay, CompensationPlan::Standard, CompensationPlan::TieredRate] {
            assert_eq!(CompensationPlan::parse(plan.as_str()), Some(plan));
            let json = serde_json::to_string(&plan).unwrap();
            assert_eq!(json, format!("\"{}\"", plan.as_str()));
        }
    }

    #[test]
    fn holdback_never_exceeds_incentive() {
        assert_eq!(holdback_amount(100.0, 150.0), 100.0);
        assert_eq!(holdback_amount(100.0, -10.0), 0.0);
        assert_eq!(holdback_amount(0.0, 20.0), 0.0);
    }
}
