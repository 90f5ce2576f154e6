use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {field} = {value}")]
    InvalidInput { field: &'static str, value: f64 },

    #[error("Invalid month: {month} (expected 1..=12)")]
    InvalidMonth { month: u32 },

    #[error("No market benchmark for specialty '{specialty}'")]
    MissingBenchmark { specialty: String },

    #[error("Computation skipped for provider '{provider_id}': {reason}")]
    ComputationSkipped { provider_id: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CompResult<T> = Result<T, CompError>;

impl CompError {
    /// Guard helper: fail with `InvalidInput` unless `value` is finite and > 0.
    pub fn require_positive(field: &'static str, value: f64) -> CompResult<f64> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(CompError::InvalidInput { field, value })
        }
    }

    /// Guard helper: fail with `InvalidInput` unless `value` is finite.
    pub fn require_finite(field: &'static str, value: f64) -> CompResult<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(CompError::InvalidInput { field, value })
        }
    }
}
