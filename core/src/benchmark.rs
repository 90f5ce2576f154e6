//! Market benchmark curves and percentile interpolation.
//!
//! A curve is four survey points (25th/50th/75th/90th). Values between
//! points are linearly interpolated; values outside the curve are
//! extrapolated, proportionally below p25 and against a fixed p90 base
//! above p90 (capped at 100).

use crate::error::{CompError, CompResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkCurve {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl BenchmarkCurve {
    pub fn new(p25: f64, p50: f64, p75: f64, p90: f64) -> Self {
        Self { p25, p50, p75, p90 }
    }

    /// No survey data: every point is zero or missing.
    pub fn is_empty(&self) -> bool {
        self.points().iter().all(|(_, v)| !(v.is_finite() && *v > 0.0))
    }

    /// Points never decrease from p25 to p90.
    pub fn is_ordered(&self) -> bool {
        let pts = self.points();
        pts.windows(2).all(|w| w[0].1 <= w[1].1)
    }

    /// (percentile, value) pairs in ascending percentile order.
    pub fn points(&self) -> [(f64, f64); 4] {
        [
            (25.0, self.p25),
            (50.0, self.p50),
            (75.0, self.p75),
            (90.0, self.p90),
        ]
    }
}

/// Percentile rank of `value` against `curve`.
///
/// A missing or empty curve ranks everything at 0. Negative or
/// non-finite values are rejected.
pub fn percentile_of(value: f64, curve: Option<&BenchmarkCurve>) -> CompResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(CompError::InvalidInput { field: "percentile value", value });
    }
    let curve = match curve {
        Some(c) if !c.is_empty() => c,
        _ => return Ok(0.0),
    };
    if !curve.is_ordered() {
        log::warn!("benchmark curve is not ascending, ranking as 0: {curve:?}");
        return Ok(0.0);
    }

    if value < curve.p25 {
        if curve.p25 <= 0.0 {
            return Ok(0.0);
        }
        return Ok((value / curve.p25) * 25.0);
    }

    if value > curve.p90 {
        return Ok((90.0 + ((value - curve.p90) / curve.p90) * 10.0).min(100.0));
    }

    let points = curve.points();
    for pair in points.windows(2) {
        let (lower_pct, lower) = pair[0];
        let (upper_pct, upper) = pair[1];
        if value >= lower && value <= upper {
            if upper == lower {
                return Ok(lower_pct);
            }
            return Ok(lower_pct + (value - lower) / (upper - lower) * (upper_pct - lower_pct));
        }
    }

    // Unreachable for an ordered curve with p25 <= value <= p90.
    Ok(0.0)
}

/// One specialty's row from the market survey.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketBenchmark {
    pub specialty: String,
    pub total_comp: BenchmarkCurve,
    pub wrvus: BenchmarkCurve,
    pub conversion_factor: BenchmarkCurve,
}

/// Specialty-keyed view over the survey rows of one snapshot.
///
/// Keys are matched case-insensitively after trimming, so "Family
/// Medicine " and "family medicine" resolve to the same row.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkTable {
    rows: HashMap<String, MarketBenchmark>,
}

impl BenchmarkTable {
    pub fn new(rows: &[MarketBenchmark]) -> Self {
        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            if map.insert(normalize(&row.specialty), row.clone()).is_some() {
                log::warn!("duplicate benchmark row for '{}', last one wins", row.specialty);
            }
        }
        Self { rows: map }
    }

    pub fn get(&self, specialty: &str) -> Option<&MarketBenchmark> {
        self.rows.get(&normalize(specialty))
    }

    pub fn require(&self, specialty: &str) -> CompResult<&MarketBenchmark> {
        self.get(specialty).ok_or_else(|| CompError::MissingBenchmark {
            specialty: specialty.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn normalize(specialty: &str) -> String {
    specialty.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_padding() {
        let table = BenchmarkTable::new(&[MarketBenchmark {
            specialty: "Family Medicine".into(),
            ..Default::default()
        }]);
        assert!(table.get("  family medicine ").is_some());
        assert!(matches!(
            table.require("Cardiology"),
            Err(CompError::MissingBenchmark { .. })
        ));
    }

    #[test]
    fn descending_curve_ranks_zero() {
        let curve = BenchmarkCurve::new(5500.0, 5000.0, 4500.0, 4000.0);
        assert_eq!(percentile_of(4700.0, Some(&curve)).unwrap(), 0.0);
    }
}
