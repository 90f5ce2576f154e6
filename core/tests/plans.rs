//! Incentive and holdback under each compensation plan.

mod common;

use common::family_medicine;
use compcalc_core::{
    config::TierThresholds,
    plan::{
        holdback_amount, resolve_holdback_percent, variance_incentive, CompensationPlan,
        PlanContext, PlanRates,
    },
    target::{ConversionFactor, RateSource},
};

fn tiered_rates() -> PlanRates {
    PlanRates { p25: 40.0, p50: 45.0, p75: 50.0, p90: 55.0 }
}

#[test]
fn standard_pays_variance_times_rate() {
    // 450 - 416 = 34 wRVUs over target at $45
    assert_eq!(CompensationPlan::Standard.incentive(450.0, 416.0, 45.0), 1530.0);
}

#[test]
fn holdback_withholds_a_share_of_incentive() {
    let holdback = CompensationPlan::Standard.holdback(1530.0, 20.0);
    assert_eq!(holdback, 306.0);
    assert_eq!(1530.0 - holdback, 1224.0);
}

#[test]
fn compute_combines_incentive_and_holdback() {
    let rates = PlanRates::flat(45.0);
    let thresholds = TierThresholds::default();
    let ctx = PlanContext { rates: &rates, thresholds: &thresholds, holdback_percent: 20.0 };

    let outcome = CompensationPlan::Standard.compute(450.0, 416.0, 60.0, &ctx);
    assert_eq!(outcome.incentive, 1530.0);
    assert_eq!(outcome.holdback, 306.0);
    assert_eq!(outcome.net_incentive(), 1224.0);
    assert_eq!(outcome.conversion_factor_used, 45.0);
}

#[test]
fn standard_pays_nothing_at_or_below_target() {
    for actual in [0.0, 300.0, 415.99, 416.0] {
        assert_eq!(CompensationPlan::Standard.incentive(actual, 416.0, 45.0), 0.0);
    }
}

#[test]
fn standard_scales_linearly_with_variance() {
    let one = variance_incentive(426.0, 416.0, 45.0);
    let three = variance_incentive(446.0, 416.0, 45.0);
    assert_eq!(one, 450.0);
    assert_eq!(three, 3.0 * one);
}

#[test]
fn base_pay_never_earns_incentive_or_holdback() {
    let rates = tiered_rates();
    let thresholds = TierThresholds::default();
    let ctx = PlanContext { rates: &rates, thresholds: &thresholds, holdback_percent: 20.0 };

    let outcome = CompensationPlan::BasePay.compute(900.0, 416.0, 99.0, &ctx);
    assert_eq!(outcome.incentive, 0.0);
    assert_eq!(outcome.holdback, 0.0);
    assert_eq!(outcome.conversion_factor_used, 0.0);
}

#[test]
fn tiered_rate_follows_the_providers_own_percentile() {
    let rates = tiered_rates();
    let thresholds = TierThresholds::default();
    let plan = CompensationPlan::TieredRate;

    assert_eq!(plan.rate_for(&rates, 95.0, &thresholds), 55.0);
    assert_eq!(plan.rate_for(&rates, 90.0, &thresholds), 55.0);
    assert_eq!(plan.rate_for(&rates, 80.0, &thresholds), 50.0);
    assert_eq!(plan.rate_for(&rates, 60.0, &thresholds), 45.0);
    assert_eq!(plan.rate_for(&rates, 30.0, &thresholds), 40.0);
    // Below the lowest tier the median rate applies.
    assert_eq!(plan.rate_for(&rates, 10.0, &thresholds), 45.0);
}

#[test]
fn tiered_rate_pays_more_than_standard_at_the_top_tier() {
    let rates = tiered_rates();
    let thresholds = TierThresholds::default();
    let ctx = PlanContext { rates: &rates, thresholds: &thresholds, holdback_percent: 0.0 };

    let standard = CompensationPlan::Standard.compute(600.0, 500.0, 95.0, &ctx);
    let tiered = CompensationPlan::TieredRate.compute(600.0, 500.0, 95.0, &ctx);
    assert_eq!(standard.incentive, 4500.0);
    assert_eq!(tiered.incentive, 5500.0);

    // Same variance rule: nothing below target regardless of tier.
    assert_eq!(CompensationPlan::TieredRate.compute(450.0, 500.0, 95.0, &ctx).incentive, 0.0);
}

#[test]
fn holdback_percent_resolution_order() {
    assert_eq!(resolve_holdback_percent(Some(10.0), Some(15.0), 20.0), 10.0);
    assert_eq!(resolve_holdback_percent(None, Some(15.0), 20.0), 15.0);
    assert_eq!(resolve_holdback_percent(None, None, 20.0), 20.0);
    assert_eq!(resolve_holdback_percent(Some(f64::NAN), Some(15.0), 20.0), 15.0);
    assert_eq!(resolve_holdback_percent(Some(0.0), Some(15.0), 20.0), 0.0);
    assert_eq!(resolve_holdback_percent(Some(140.0), None, 20.0), 100.0);
}

#[test]
fn holdback_is_bounded_by_incentive() {
    assert_eq!(holdback_amount(1000.0, 20.0), 200.0);
    assert_eq!(holdback_amount(1000.0, 100.0), 1000.0);
    assert_eq!(holdback_amount(1000.0, 250.0), 1000.0);
    assert_eq!(holdback_amount(1000.0, -5.0), 0.0);
    assert_eq!(holdback_amount(-50.0, 20.0), 0.0);
}

#[test]
fn plan_rates_come_from_the_conversion_factor_curve() {
    let bench = family_medicine();
    let median = ConversionFactor { rate: 45.0, source: RateSource::Benchmark };
    assert_eq!(PlanRates::from_benchmark(Some(&bench), median), tiered_rates());

    let mut sparse = family_medicine();
    sparse.conversion_factor.p90 = 0.0;
    let rates = PlanRates::from_benchmark(Some(&sparse), median);
    assert_eq!(rates.p90, 45.0);
    assert_eq!(rates.p75, 50.0);

    let fallback = ConversionFactor { rate: 39.0, source: RateSource::Fallback };
    assert_eq!(PlanRates::from_benchmark(None, fallback), PlanRates::flat(39.0));
}
