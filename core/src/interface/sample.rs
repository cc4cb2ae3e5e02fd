use crate::prelude::{Timestamp, TrackerError, TrackerResult};
use serde::{Deserialize, Serialize};

/// One qualifying beacon frame, tagged with the heading at reception time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub rssi: f64,
    pub heading: f64,
}

impl Sample {
    pub fn new(timestamp: Timestamp, rssi: f64, heading: f64) -> Self {
        Self {
            timestamp,
            rssi,
            heading,
        }
    }
}

pub const DEFAULT_TX_POWER_AT_1M: f64 = -61.0;
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 2.5;

/// The two persisted constants of the path-loss model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// Expected RSSI at one meter, in dBm.
    pub tx_power_at_1m: f64,
    pub path_loss_exponent: f64,
}

impl CalibrationParams {
    pub fn new(tx_power_at_1m: f64, path_loss_exponent: f64) -> TrackerResult<Self> {
        let params = Self {
            tx_power_at_1m,
            path_loss_exponent,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> TrackerResult<()> {
        if !self.tx_power_at_1m.is_finite() {
            return Err(TrackerError::InvalidCalibration(format!(
                "tx power {} is not finite",
                self.tx_power_at_1m
            )));
        }
        if !(self.path_loss_exponent.is_finite() && self.path_loss_exponent > 0.0) {
            return Err(TrackerError::InvalidCalibration(format!(
                "path loss exponent {} must be positive",
                self.path_loss_exponent
            )));
        }
        Ok(())
    }
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            tx_power_at_1m: DEFAULT_TX_POWER_AT_1M,
            path_loss_exponent: DEFAULT_PATH_LOSS_EXPONENT,
        }
    }
}

/// Outcome of a one-meter calibration burst.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub accepted: bool,
    pub new_tx_power: Option<f64>,
    pub sample_count: usize,
}
