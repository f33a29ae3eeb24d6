//! Errors reported by the edge model.

use thiserror::Error;

/// Errors of model construction and result reporting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Invalid construction parameters. Reported before any simulated time advances.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Sum of average per-stage latencies differs from the average end-to-end latency.
    #[error("sum of stage latencies {actual:.3} ms differs from total latency {expected:.3} ms by more than {tolerance} ms")]
    InvariantViolation {
        expected: f64,
        actual: f64,
        tolerance: f64,
    },
}

impl SimError {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        SimError::Configuration(msg.into())
    }
}
