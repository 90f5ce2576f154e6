//! Input snapshots: everything one batch reads, loaded upfront.
//!
//! The host system assembles an InputSnapshot (from its own store, or
//! from `CompStore::load_snapshot`) and hands it to the engine. Nothing
//! inside the numeric core performs I/O.

use crate::{
    adjustment::Adjustment,
    benchmark::MarketBenchmark,
    error::CompResult,
    plan::CompensationPlan,
    types::{check_month, Month, ProviderId, Year, MONTHS_PER_YEAR},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    pub provider_id: ProviderId,
    #[serde(default)]
    pub name: String,
    pub specialty: String,
    /// Annual base salary in dollars.
    pub base_salary: f64,
    pub fte: f64,
    pub clinical_fte: f64,
    pub compensation_model: CompensationPlan,
    /// Annual wRVU baseline from the contract. Reported against, not
    /// used to derive targets.
    #[serde(default)]
    pub target_wrvus: f64,
    /// Provider-specific holdback override, in percent.
    #[serde(default)]
    pub holdback_percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyActual {
    pub provider_id: ProviderId,
    pub year: Year,
    pub month: Month,
    pub wrvus: f64,
    #[serde(default)]
    pub hours_worked: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrganizationSettings {
    /// Organization-wide holdback percent; overrides the engine default.
    #[serde(default)]
    pub default_holdback_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InputSnapshot {
    pub providers: Vec<Provider>,
    #[serde(default)]
    pub benchmarks: Vec<MarketBenchmark>,
    #[serde(default)]
    pub actuals: Vec<MonthlyActual>,
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
    #[serde(default)]
    pub settings: OrganizationSettings,
}

impl InputSnapshot {
    pub fn from_json(json: &str) -> CompResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Reject month fields outside 1..=12 before any computation starts.
    pub fn validate(&self) -> CompResult<()> {
        for a in &self.actuals {
            check_month(a.month)?;
        }
        for a in &self.adjustments {
            check_month(a.month)?;
        }
        Ok(())
    }

    /// Index raw wRVUs by provider for one year.
    ///
    /// Duplicate (provider, month) rows collapse to the last one seen,
    /// matching upsert semantics in the host store.
    pub fn actuals_by_provider(&self, year: Year) -> HashMap<&str, MonthlyWrvus> {
        let mut index: HashMap<&str, MonthlyWrvus> = HashMap::new();
        for a in self.actuals.iter().filter(|a| a.year == year) {
            if check_month(a.month).is_err() {
                continue;
            }
            let slot = &mut index.entry(a.provider_id.as_str()).or_default().0[a.month as usize - 1];
            if slot.is_some() {
                log::warn!(
                    "duplicate actual for {}/{}/{}, keeping the later row",
                    a.provider_id, a.year, a.month
                );
            }
            *slot = Some(a.wrvus);
        }
        index
    }
}

/// Raw wRVUs per month for one provider-year; `None` where no entry exists.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonthlyWrvus(pub [Option<f64>; MONTHS_PER_YEAR as usize]);

impl MonthlyWrvus {
    pub fn from_values(values: [f64; MONTHS_PER_YEAR as usize]) -> Self {
        Self(values.map(Some))
    }

    /// Raw wRVUs for `month`; a missing entry counts as zero.
    pub fn get(&self, month: Month) -> f64 {
        month
            .checked_sub(1)
            .and_then(|i| self.0.get(i as usize))
            .copied()
            .flatten()
            .unwrap_or(0.0)
    }
}
