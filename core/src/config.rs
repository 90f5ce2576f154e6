//! Engine configuration.
//!
//! Every tunable the calculation depends on lives here so that the
//! numeric core never embeds a constant the host might need to change.
//! Loaded from a JSON file; any field missing from the file falls back
//! to its default.

use serde::{Deserialize, Serialize};

pub const DEFAULT_FALLBACK_CONVERSION_FACTOR: f64 = 45.0;
pub const DEFAULT_HOLDBACK_PERCENT: f64 = 20.0;
pub const DEFAULT_ROUNDING_PLACES: u32 = 2;
/// `10^places` scaling must stay well inside f64 precision.
pub const MAX_ROUNDING_PLACES: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// $/wRVU used when a specialty has no usable conversion-factor row.
    pub fallback_conversion_factor: f64,
    /// Last step of the holdback resolution chain.
    pub hard_default_holdback_percent: f64,
    /// Decimal places applied to every emitted figure.
    pub rounding_places: u32,
    pub tier_thresholds: TierThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_conversion_factor:    DEFAULT_FALLBACK_CONVERSION_FACTOR,
            hard_default_holdback_percent: DEFAULT_HOLDBACK_PERCENT,
            rounding_places:               DEFAULT_ROUNDING_PLACES,
            tier_thresholds:               TierThresholds::default(),
        }
    }
}

/// Percentile cut-offs that select a tiered-rate plan's conversion factor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TierThresholds {
    pub p90: f64,
    pub p75: f64,
    pub p50: f64,
    pub p25: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self { p90: 90.0, p75: 75.0, p50: 50.0, p25: 25.0 }
    }
}

impl EngineConfig {
    /// Load from a JSON file.
    /// In tests, use EngineConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        Self::default()
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(self.fallback_conversion_factor.is_finite() && self.fallback_conversion_factor > 0.0) {
            anyhow::bail!(
                "fallback_conversion_factor must be positive, got {}",
                self.fallback_conversion_factor
            );
        }
        if !(0.0..=100.0).contains(&self.hard_default_holdback_percent) {
            anyhow::bail!(
                "hard_default_holdback_percent must be within 0..=100, got {}",
                self.hard_default_holdback_percent
            );
        }
        if self.rounding_places > MAX_ROUNDING_PLACES {
            anyhow::bail!(
                "rounding_places must be at most {MAX_ROUNDING_PLACES}, got {}",
                self.rounding_places
            );
        }
        let t = &self.tier_thresholds;
        if !(t.p25 <= t.p50 && t.p50 <= t.p75 && t.p75 <= t.p90) {
            anyhow::bail!("tier_thresholds must be ascending: {t:?}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_takes_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "fallback_conversion_factor": 50.5 }"#).unwrap();
        assert_eq!(config.fallback_conversion_factor, 50.5);
        assert_eq!(config.hard_default_holdback_percent, 20.0);
        assert_eq!(config.rounding_places, 2);
        assert_eq!(config.tier_thresholds, TierThresholds::default());
    }

    #[test]
    fn descending_tiers_rejected() {
        let mut config = EngineConfig::default_test();
        config.tier_thresholds.p75 = 95.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn excessive_rounding_places_rejected() {
        let mut config = EngineConfig::default_test();
        config.rounding_places = 400;
        assert!(config.validate().is_err());
        config.rounding_places = MAX_ROUNDING_PLACES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_rejects_out_of_range_rounding() {
        let path = std::env::temp_dir().join(format!("compcalc-cfg-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "rounding_places": 400 }"#).unwrap();
        let result = EngineConfig::load(path.to_str().unwrap());
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn non_positive_fallback_rejected() {
        let mut config = EngineConfig::default_test();
        config.fallback_conversion_factor = 0.0;
        assert!(config.validate().is_err());
    }
}
