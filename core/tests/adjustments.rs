//! Adjustment aggregation windows and whole-series replacement.

mod common;

use common::{adjustment, YEAR};
use compcalc_core::adjustment::{
    sum_for_period, AdjustmentKind, AdjustmentLedger, MonthFilter,
};

#[test]
fn exact_month_and_year_to_date_windows() {
    let entries: Vec<_> = (1..=12)
        .map(|m| adjustment(AdjustmentKind::Target, "dr-a", m, "leave", m as f64))
        .collect();

    assert_eq!(
        sum_for_period(&entries, AdjustmentKind::Target, "dr-a", YEAR, MonthFilter::Exact(4)),
        4.0
    );
    // 1 + 2 + 3 + 4
    assert_eq!(
        sum_for_period(&entries, AdjustmentKind::Target, "dr-a", YEAR, MonthFilter::YearToDate(4)),
        10.0
    );
    assert_eq!(
        sum_for_period(&entries, AdjustmentKind::Target, "dr-a", YEAR, MonthFilter::YearToDate(12)),
        78.0
    );
}

#[test]
fn other_providers_years_and_kinds_are_excluded() {
    let mut other_year = adjustment(AdjustmentKind::Productivity, "dr-a", 2, "x", 100.0);
    other_year.year = YEAR - 1;
    let entries = vec![
        adjustment(AdjustmentKind::Productivity, "dr-a", 2, "x", 5.0),
        adjustment(AdjustmentKind::Productivity, "dr-b", 2, "x", 50.0),
        adjustment(AdjustmentKind::Target, "dr-a", 2, "x", 500.0),
        other_year,
    ];
    assert_eq!(
        sum_for_period(&entries, AdjustmentKind::Productivity, "dr-a", YEAR, MonthFilter::YearToDate(12)),
        5.0
    );
}

#[test]
fn multiple_named_series_stack_in_the_same_month() {
    let entries = vec![
        adjustment(AdjustmentKind::AdditionalPay, "dr-a", 6, "call pay", 1200.0),
        adjustment(AdjustmentKind::AdditionalPay, "dr-a", 6, "quality bonus", 800.0),
    ];
    assert_eq!(
        sum_for_period(&entries, AdjustmentKind::AdditionalPay, "dr-a", YEAR, MonthFilter::Exact(6)),
        2000.0
    );
}

#[test]
fn replace_series_drops_every_prior_entry_and_writes_twelve() {
    let mut ledger = AdjustmentLedger::new();
    ledger.replace_series(AdjustmentKind::Productivity, "dr-a", YEAR, "teaching", [10.0; 12]);
    assert_eq!(ledger.entries().len(), 12);

    let mut revised = [0.0; 12];
    revised[2] = 5.0;
    let removed =
        ledger.replace_series(AdjustmentKind::Productivity, "dr-a", YEAR, "teaching", revised);

    assert_eq!(removed, 12);
    assert_eq!(ledger.entries().len(), 12);
    assert_eq!(
        ledger.sum(AdjustmentKind::Productivity, "dr-a", YEAR, MonthFilter::YearToDate(12)),
        5.0
    );
    assert_eq!(
        ledger.sum(AdjustmentKind::Productivity, "dr-a", YEAR, MonthFilter::Exact(3)),
        5.0
    );
}

#[test]
fn replace_series_leaves_other_series_alone() {
    let mut ledger = AdjustmentLedger::new();
    ledger.replace_series(AdjustmentKind::Productivity, "dr-a", YEAR, "teaching", [1.0; 12]);
    ledger.replace_series(AdjustmentKind::Productivity, "dr-a", YEAR, "admin", [2.0; 12]);
    ledger.replace_series(AdjustmentKind::Target, "dr-a", YEAR, "teaching", [3.0; 12]);
    ledger.replace_series(AdjustmentKind::Productivity, "dr-b", YEAR, "teaching", [4.0; 12]);

    let removed =
        ledger.replace_series(AdjustmentKind::Productivity, "dr-a", YEAR, "teaching", [0.0; 12]);

    assert_eq!(removed, 12);
    assert_eq!(ledger.entries().len(), 48);
    assert_eq!(
        ledger.sum(AdjustmentKind::Productivity, "dr-a", YEAR, MonthFilter::YearToDate(12)),
        24.0
    );
    assert_eq!(
        ledger.sum(AdjustmentKind::Target, "dr-a", YEAR, MonthFilter::YearToDate(12)),
        36.0
    );
    assert_eq!(
        ledger.entries().iter().filter(|a| a.provider_id == "dr-b").count(),
        12
    );
}
