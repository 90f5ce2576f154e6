//! Time-scoped adjustments: productivity, target, and additional pay.
//!
//! Entries sharing (kind, name, provider, year) form one 12-month
//! series. A series is only ever replaced whole; there is no
//! single-month edit path.

use crate::{
    error::CompResult,
    types::{check_month, Month, ProviderId, Year, MONTHS_PER_YEAR},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    /// Added to the month's raw wRVUs.
    Productivity,
    /// Added to the month's wRVU target.
    Target,
    /// Dollars added to the month's total compensation.
    AdditionalPay,
}

impl AdjustmentKind {
    pub const ALL: [AdjustmentKind; 3] = [
        AdjustmentKind::Productivity,
        AdjustmentKind::Target,
        AdjustmentKind::AdditionalPay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Productivity  => "productivity",
            Self::Target        => "target",
            Self::AdditionalPay => "additional_pay",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Adjustment {
    pub kind: AdjustmentKind,
    pub provider_id: ProviderId,
    pub year: Year,
    pub month: Month,
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthFilter {
    /// Only entries dated in this month.
    Exact(Month),
    /// Entries dated in months 1..=this month.
    YearToDate(Month),
}

impl MonthFilter {
    pub fn matches(&self, month: Month) -> bool {
        match *self {
            MonthFilter::Exact(m)      => month == m,
            MonthFilter::YearToDate(m) => month >= 1 && month <= m,
        }
    }
}

/// Sum every `kind` entry for (provider, year) that passes `filter`.
pub fn sum_for_period(
    adjustments: &[Adjustment],
    kind: AdjustmentKind,
    provider_id: &str,
    year: Year,
    filter: MonthFilter,
) -> f64 {
    adjustments
        .iter()
        .filter(|a| {
            a.kind == kind
                && a.year == year
                && a.provider_id == provider_id
                && filter.matches(a.month)
        })
        .map(|a| a.value)
        .sum()
}

/// In-memory adjustment store with whole-series replacement.
#[derive(Debug, Clone, Default)]
pub struct AdjustmentLedger {
    entries: Vec<Adjustment>,
}

impl AdjustmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<Adjustment>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Adjustment] {
        &self.entries
    }

    /// Replace the named series for (kind, provider, year) with twelve
    /// monthly values. Returns how many prior entries were removed.
    ///
    /// Adding one month means resubmitting all twelve.
    pub fn replace_series(
        &mut self,
        kind: AdjustmentKind,
        provider_id: &str,
        year: Year,
        name: &str,
        values: [f64; MONTHS_PER_YEAR as usize],
    ) -> usize {
        let before = self.entries.len();
        self.entries.retain(|a| {
            !(a.kind == kind && a.provider_id == provider_id && a.year == year && a.name == name)
        });
        let removed = before - self.entries.len();

        self.entries.extend(values.iter().enumerate().map(|(i, &value)| Adjustment {
            kind,
            provider_id: provider_id.to_string(),
            year,
            month: i as Month + 1,
            name: name.to_string(),
            value,
        }));

        log::debug!(
            "replaced {} series '{name}' for {provider_id}/{year} ({removed} prior entries)",
            kind.as_str()
        );
        removed
    }

    pub fn sum(
        &self,
        kind: AdjustmentKind,
        provider_id: &str,
        year: Year,
        filter: MonthFilter,
    ) -> f64 {
        sum_for_period(&self.entries, kind, provider_id, year, filter)
    }

    /// Reject entries whose month is outside 1..=12.
    pub fn validate(&self) -> CompResult<()> {
        for a in &self.entries {
            check_month(a.month)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adj(kind: AdjustmentKind, month: Month, name: &str, value: f64) -> Adjustment {
        Adjustment {
            kind,
            provider_id: "p1".into(),
            year: 2024,
            month,
            name: name.into(),
            value,
        }
    }

    #[test]
    fn kinds_aggregate_independently() {
        let entries = vec![
            adj(AdjustmentKind::Productivity, 3, "a", 10.0),
            adj(AdjustmentKind::Target, 3, "a", -5.0),
            adj(AdjustmentKind::AdditionalPay, 3, "a", 250.0),
        ];
        let f = MonthFilter::Exact(3);
        assert_eq!(sum_for_period(&entries, AdjustmentKind::Productivity, "p1", 2024, f), 10.0);
        assert_eq!(sum_for_period(&entries, AdjustmentKind::Target, "p1", 2024, f), -5.0);
        assert_eq!(sum_for_period(&entries, AdjustmentKind::AdditionalPay, "p1", 2024, f), 250.0);
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in AdjustmentKind::ALL {
            assert_eq!(AdjustmentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AdjustmentKind::parse("bonus"), None);
    }

    #[test]
    fn out_of_range_month_fails_validation() {
        let ledger = AdjustmentLedger::from_entries(vec![adj(AdjustmentKind::Target, 13, "x", 1.0)]);
        assert!(ledger.validate().is_err());
    }
}
