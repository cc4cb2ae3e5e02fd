/// Seconds on the host's monotonic clock.
pub type Timestamp = f64;

/// Boundary errors. Degraded estimation states are outputs, not errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no active scanning session")]
    SessionInactive,
    #[error("calibration unavailable: {0}")]
    CalibrationUnavailable(String),
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),
    #[error("update loop has shut down")]
    QueueClosed,
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Stateful estimation stage owned by a single writer.
pub trait EstimationStage {
    fn name(&self) -> &'static str;
    /// Drops every piece of accumulated state, as on a session restart.
    fn reset(&mut self);
}

/// Rejects NaN and infinities before they reach estimator state.
pub fn ensure_finite(value: f64, what: &str) -> TrackerResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TrackerError::InvalidInput(format!(
            "{} must be finite, got {}",
            what, value
        )))
    }
}
