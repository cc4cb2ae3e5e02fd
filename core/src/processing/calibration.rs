use crate::config::CalibrationConfig;
use crate::interface::{CalibrationParams, CalibrationResult};
use crate::math::stats::StatsHelper;
use crate::prelude::Timestamp;

/// One-shot RSSI burst collected with the tag held at one meter.
///
/// The routine only gathers samples; [`CalibrationRoutine::finish`] turns them
/// into a result once the deadline has passed. Committing the new transmit
/// power is left to the owner so calibration is replaced in one step.
#[derive(Debug, Clone)]
pub struct CalibrationRoutine {
    deadline: Timestamp,
    min_samples: usize,
    samples: Vec<f64>,
}

impl CalibrationRoutine {
    pub fn begin(now: Timestamp, config: &CalibrationConfig) -> Self {
        Self {
            deadline: now + config.duration_secs,
            min_samples: config.min_samples,
            samples: Vec::new(),
        }
    }

    pub fn deadline(&self) -> Timestamp {
        self.deadline
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Records a raw RSSI reading; readings after the deadline are ignored.
    pub fn record(&mut self, rssi: f64, now: Timestamp) {
        if now <= self.deadline {
            self.samples.push(rssi);
        }
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        now >= self.deadline
    }

    /// Consumes the routine once due; otherwise hands it back unchanged.
    pub fn finish(self, now: Timestamp) -> Result<CalibrationResult, Self> {
        if !self.is_due(now) {
            return Err(self);
        }
        let sample_count = self.samples.len();
        let new_tx_power = if sample_count >= self.min_samples {
            StatsHelper::median(&self.samples).map(f64::round)
        } else {
            None
        };
        Ok(CalibrationResult {
            accepted: new_tx_power.is_some(),
            new_tx_power,
            sample_count,
        })
    }

    /// Calibration to commit for an accepted result, keeping the path-loss exponent.
    pub fn apply(result: &CalibrationResult, current: &CalibrationParams) -> Option<CalibrationParams> {
        result.new_tx_power.map(|tx_power_at_1m| CalibrationParams {
            tx_power_at_1m,
            path_loss_exponent: current.path_loss_exponent,
        })
    }
}
