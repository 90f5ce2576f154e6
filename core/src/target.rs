//! wRVU targets derived from salary, conversion factor, and clinical FTE.
//!
//!   monthly_target             = base_salary / conversion_factor / 12 * clinical_fte
//!   monthly_target_adjusted(m) = monthly_target + target adjustments in m
//!   cumulative_target(m)       = monthly_target * m + target adjustments in 1..=m

use crate::{
    adjustment::{sum_for_period, Adjustment, AdjustmentKind, MonthFilter},
    benchmark::MarketBenchmark,
    error::{CompError, CompResult},
    snapshot::Provider,
    types::{check_month, Month, Year, MONTHS_PER_YEAR},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Median conversion factor from the specialty's survey row.
    Benchmark,
    /// Configured fallback; the specialty had no usable row.
    Fallback,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConversionFactor {
    pub rate: f64,
    pub source: RateSource,
}

/// The specialty's p50 $/wRVU, or `fallback` when the row is missing
/// or its median is not positive.
pub fn resolve_conversion_factor(
    benchmark: Option<&MarketBenchmark>,
    fallback: f64,
) -> ConversionFactor {
    match benchmark {
        Some(b) if b.conversion_factor.p50.is_finite() && b.conversion_factor.p50 > 0.0 => {
            ConversionFactor { rate: b.conversion_factor.p50, source: RateSource::Benchmark }
        }
        _ => ConversionFactor { rate: fallback, source: RateSource::Fallback },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetCalculator {
    monthly_target: f64,
}

impl TargetCalculator {
    /// Fails with `InvalidInput` unless all three inputs are strictly positive.
    pub fn new(base_salary: f64, conversion_factor: f64, clinical_fte: f64) -> CompResult<Self> {
        let base_salary = CompError::require_positive("base_salary", base_salary)?;
        let conversion_factor = CompError::require_positive("conversion_factor", conversion_factor)?;
        let clinical_fte = CompError::require_positive("clinical_fte", clinical_fte)?;

        Ok(Self {
            monthly_target: (base_salary / conversion_factor / MONTHS_PER_YEAR as f64)
                * clinical_fte,
        })
    }

    pub fn for_provider(provider: &Provider, conversion_factor: f64) -> CompResult<Self> {
        Self::new(provider.base_salary, conversion_factor, provider.clinical_fte)
    }

    /// Unadjusted monthly wRVU target.
    pub fn monthly_target(&self) -> f64 {
        self.monthly_target
    }

    pub fn annual_target(&self) -> f64 {
        self.monthly_target * MONTHS_PER_YEAR as f64
    }

    pub fn monthly_target_adjusted(
        &self,
        adjustments: &[Adjustment],
        provider_id: &str,
        year: Year,
        month: Month,
    ) -> CompResult<f64> {
        let month = check_month(month)?;
        Ok(self.monthly_target
            + sum_for_period(
                adjustments,
                AdjustmentKind::Target,
                provider_id,
                year,
                MonthFilter::Exact(month),
            ))
    }

    pub fn cumulative_target(
        &self,
        adjustments: &[Adjustment],
        provider_id: &str,
        year: Year,
        month: Month,
    ) -> CompResult<f64> {
        let month = check_month(month)?;
        Ok(self.monthly_target * month as f64
            + sum_for_period(
                adjustments,
                AdjustmentKind::Target,
                provider_id,
                year,
                MonthFilter::YearToDate(month),
            ))
    }
}
