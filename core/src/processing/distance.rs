use crate::config::FilterConfig;
use crate::interface::{CalibrationParams, DistanceEstimate};
use crate::prelude::EstimationStage;
use crate::processing::robust_filter::RobustFilter;
use crate::telemetry::log::LogManager;

pub const MAX_DISTANCE_M: f64 = 100.0;

/// Log-distance path-loss model.
pub struct DistanceEstimator;

impl DistanceEstimator {
    /// `10 ^ ((tx_power - rssi) / (10 * n))`, clamped to `[0, 100]` meters.
    pub fn estimate(smoothed_rssi: f64, calib: &CalibrationParams) -> f64 {
        Self::estimate_with_ceiling(smoothed_rssi, calib, MAX_DISTANCE_M)
    }

    pub fn estimate_with_ceiling(smoothed_rssi: f64, calib: &CalibrationParams, ceiling: f64) -> f64 {
        let exponent = (calib.tx_power_at_1m - smoothed_rssi) / (10.0 * calib.path_loss_exponent);
        10f64.powf(exponent).clamp(0.0, ceiling)
    }
}

/// Distance stream: model conversion followed by its own robust filter and deadband.
pub struct DistanceStage {
    filter: RobustFilter,
    ceiling: f64,
    logger: LogManager,
}

impl DistanceStage {
    pub fn new(config: FilterConfig, ceiling: f64) -> Self {
        Self {
            filter: RobustFilter::new("distance", config),
            ceiling,
            logger: LogManager::new("distance"),
        }
    }

    pub fn update(&mut self, smoothed_rssi: f64, calib: &CalibrationParams) -> DistanceEstimate {
        let raw = DistanceEstimator::estimate_with_ceiling(smoothed_rssi, calib, self.ceiling);
        let meters = self.filter.update(raw).clamp(0.0, self.ceiling);
        self.logger.trace(&format!(
            "rssi {:.1} dBm -> raw {:.2} m, published {:.2} m",
            smoothed_rssi, raw, meters
        ));
        DistanceEstimate { meters }
    }

    pub fn current(&self) -> Option<DistanceEstimate> {
        self.filter.value().map(|meters| DistanceEstimate { meters })
    }
}

impl EstimationStage for DistanceStage {
    fn name(&self) -> &'static str {
        "distance"
    }

    fn reset(&mut self) {
        self.filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_rssi_maps_to_one_meter() {
        let calib = CalibrationParams::new(-61.0, 2.5).unwrap();
        assert!((DistanceEstimator::estimate(-61.0, &calib) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn weaker_signal_is_farther() {
        let calib = CalibrationParams::default();
        let mut previous = DistanceEstimator::estimate(-30.0, &calib);
        for step in 1..=70 {
            let rssi = -30.0 - step as f64;
            let meters = DistanceEstimator::estimate(rssi, &calib);
            assert!(meters > previous, "{} dBm gave {} m", rssi, meters);
            previous = meters;
        }
    }

    #[test]
    fn distance_is_clamped_to_ceiling() {
        let calib = CalibrationParams::new(-61.0, 1.0).unwrap();
        assert_eq!(DistanceEstimator::estimate(-120.0, &calib), MAX_DISTANCE_M);
    }

    #[test]
    fn stage_smooths_and_resets() {
        let calib = CalibrationParams::default();
        let mut stage = DistanceStage::new(FilterConfig::distance(), MAX_DISTANCE_M);
        let first = stage.update(-61.0, &calib);
        assert!((first.meters - 1.0).abs() < 1e-12);
        let second = stage.update(-70.0, &calib);
        assert!(second.meters > 1.0);
        assert!(second.meters < DistanceEstimator::estimate(-70.0, &calib));
        stage.reset();
        assert!(stage.current().is_none());
    }
}
