//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use compcalc_core::{
    adjustment::{Adjustment, AdjustmentKind},
    benchmark::{BenchmarkCurve, MarketBenchmark},
    plan::CompensationPlan,
    snapshot::{InputSnapshot, MonthlyActual, OrganizationSettings, Provider},
    types::{Month, Year},
};

pub const YEAR: Year = 2024;
pub const SPECIALTY: &str = "Family Medicine";

/// wRVU curve 4000/4500/5000/5500, comp 250k/280k/320k/380k, $/wRVU 40/45/50/55.
pub fn family_medicine() -> MarketBenchmark {
    MarketBenchmark {
        specialty: SPECIALTY.into(),
        total_comp: BenchmarkCurve::new(250_000.0, 280_000.0, 320_000.0, 380_000.0),
        wrvus: BenchmarkCurve::new(4000.0, 4500.0, 5000.0, 5500.0),
        conversion_factor: BenchmarkCurve::new(40.0, 45.0, 50.0, 55.0),
    }
}

/// $270k salary at 1.0 FTE: a flat 500 wRVU monthly target at $45.
pub fn provider(id: &str, plan: CompensationPlan) -> Provider {
    Provider {
        provider_id: id.into(),
        name: format!("Dr. {id}"),
        specialty: SPECIALTY.into(),
        base_salary: 270_000.0,
        fte: 1.0,
        clinical_fte: 1.0,
        compensation_model: plan,
        target_wrvus: 6000.0,
        holdback_percent: None,
    }
}

pub fn flat_actuals(provider_id: &str, year: Year, wrvus: f64) -> Vec<MonthlyActual> {
    (1..=12)
        .map(|month| MonthlyActual {
            provider_id: provider_id.into(),
            year,
            month,
            wrvus,
            hours_worked: 160.0,
        })
        .collect()
}

pub fn adjustment(kind: AdjustmentKind, provider_id: &str, month: Month, name: &str, value: f64) -> Adjustment {
    Adjustment {
        kind,
        provider_id: provider_id.into(),
        year: YEAR,
        month,
        name: name.into(),
        value,
    }
}

/// Every provider produces `wrvus` every month of YEAR.
pub fn snapshot(providers: Vec<Provider>, wrvus: f64) -> InputSnapshot {
    let actuals = providers
        .iter()
        .flat_map(|p| flat_actuals(&p.provider_id, YEAR, wrvus))
        .collect();
    InputSnapshot {
        providers,
        benchmarks: vec![family_medicine()],
        actuals,
        adjustments: Vec::new(),
        settings: OrganizationSettings::default(),
    }
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}
