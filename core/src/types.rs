//! Shared primitive types used across the entire engine.

use crate::error::{CompError, CompResult};

/// Stable identifier of a provider record in the host system.
pub type ProviderId = String;

/// A calendar year. Always passed explicitly, never read from a clock.
pub type Year = i32;

/// A calendar month, 1 = January .. 12 = December.
pub type Month = u32;

/// The canonical batch run identifier.
pub type RunId = String;

pub const MONTHS_PER_YEAR: Month = 12;

/// Reject months outside 1..=12.
pub fn check_month(month: Month) -> CompResult<Month> {
    if (1..=MONTHS_PER_YEAR).contains(&month) {
        Ok(month)
    } else {
        Err(CompError::InvalidMonth { month })
    }
}

/// Round half away from zero to `places` decimals.
///
/// Every figure that leaves the engine goes through here so that
/// re-runs over the same inputs serialize identically.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    // Normalize -0.0 so serialized output never flips sign on zero.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
