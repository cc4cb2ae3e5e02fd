//! Bearing from a rotating observer.
//!
//! While the user turns on the spot, the body shadows the antenna and RSSI
//! peaks when the phone faces the tag. The estimator keeps a few seconds of
//! `(heading, rssi)` pairs, weights each heading by how far its RSSI sits
//! above the window median, and takes the weighted circular mean. The
//! published direction is smoothed in vector space so it never jumps across
//! the 0°/360° seam.

use crate::config::BearingConfig;
use crate::interface::{BearingEstimate, Sample};
use crate::math::angle::AngleMath;
use crate::math::stats::StatsHelper;
use crate::prelude::EstimationStage;
use crate::processing::window::BoundedWindow;
use crate::telemetry::log::LogManager;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Hard cap on retained samples, far above any realistic advertising rate.
const MAX_RETAINED_SAMPLES: usize = 1024;

/// Scale factor turning a MAD into a normal-consistent standard deviation.
const MAD_TO_SIGMA: f64 = 1.4826;

/// Why the last update did or did not move the published bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BearingStatus {
    Idle,
    InsufficientSamples,
    InsufficientRotation,
    NoCoherentSignal,
    BelowGate,
    Updated,
}

pub struct BearingEstimator {
    config: BearingConfig,
    samples: BoundedWindow<Sample>,
    smoothed: Option<Complex64>,
    estimate: BearingEstimate,
    status: BearingStatus,
    logger: LogManager,
}

impl BearingEstimator {
    pub fn new(config: BearingConfig) -> Self {
        Self {
            config,
            samples: BoundedWindow::with_capacity(MAX_RETAINED_SAMPLES),
            smoothed: None,
            estimate: BearingEstimate::default(),
            status: BearingStatus::Idle,
            logger: LogManager::new("bearing"),
        }
    }

    pub fn estimate(&self) -> BearingEstimate {
        self.estimate
    }

    pub fn status(&self) -> BearingStatus {
        self.status
    }

    pub fn retained(&self) -> usize {
        self.samples.len()
    }

    /// Adds a sample, drops everything older than the window and re-estimates.
    pub fn update(&mut self, sample: Sample) -> BearingEstimate {
        let now = sample.timestamp;
        let window_secs = self.config.window_secs;
        self.samples.push(sample);
        self.samples.evict_while(|s| now - s.timestamp > window_secs);

        self.status = self.recompute();
        self.logger.trace(&format!(
            "{:?}: angle {:?} confidence {:.2} over {} samples",
            self.status,
            self.estimate.angle_deg,
            self.estimate.confidence,
            self.samples.len()
        ));
        self.estimate
    }

    fn recompute(&mut self) -> BearingStatus {
        if self.samples.len() < self.config.min_samples {
            self.estimate.confidence = 0.0;
            return BearingStatus::InsufficientSamples;
        }

        let (min_heading, max_heading) = self.samples.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), s| (lo.min(s.heading), hi.max(s.heading)),
        );
        let spread = AngleMath::normalize(max_heading - min_heading);
        if spread < self.config.min_spread_deg {
            self.estimate.confidence = 0.0;
            return BearingStatus::InsufficientRotation;
        }

        let rssi: Vec<f64> = self.samples.iter().map(|s| s.rssi).collect();
        let Some((median, mad)) = StatsHelper::median_and_mad(&rssi, self.config.mad_floor) else {
            self.estimate.confidence = 0.0;
            return BearingStatus::InsufficientSamples;
        };

        let weighted: Vec<(f64, f64)> = self
            .samples
            .iter()
            .map(|s| {
                let z = (s.rssi - median) / (MAD_TO_SIGMA * mad);
                (s.heading, (z + 1.0).max(0.0))
            })
            .collect();

        let Some((mean_deg, resultant)) = AngleMath::circular_weighted_mean(&weighted) else {
            self.estimate.confidence = 0.0;
            return BearingStatus::NoCoherentSignal;
        };

        let confidence = resultant.clamp(0.0, 1.0);
        self.estimate.confidence = confidence;
        if confidence <= self.config.confidence_gate {
            return BearingStatus::BelowGate;
        }

        let direction = AngleMath::unit_vector(mean_deg, 1.0);
        let blended = match self.smoothed {
            Some(previous) => direction * self.config.blend + previous * (1.0 - self.config.blend),
            None => direction,
        };
        self.smoothed = Some(blended);
        // exactly opposing vectors cancel; keep the last fix
        if blended.norm() > f64::EPSILON {
            self.estimate.angle_deg = Some(AngleMath::vector_angle(blended));
        }
        BearingStatus::Updated
    }
}

impl EstimationStage for BearingEstimator {
    fn name(&self) -> &'static str {
        "bearing"
    }

    fn reset(&mut self) {
        self.samples.reset();
        self.smoothed = None;
        self.estimate = BearingEstimate::default();
        self.status = BearingStatus::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// RSSI pattern peaking when the observer faces `peak_deg`.
    fn rssi_towards(heading: f64, peak_deg: f64) -> f64 {
        -70.0 + 10.0 * AngleMath::to_radians(heading - peak_deg).cos()
    }

    fn rotate(estimator: &mut BearingEstimator, peak_deg: f64, turns: usize) -> BearingEstimate {
        let mut estimate = BearingEstimate::default();
        for i in 0..(60 * turns) {
            let heading = AngleMath::normalize(i as f64 * 6.0);
            let sample = Sample::new(i as f64 * 0.1, rssi_towards(heading, peak_deg), heading);
            estimate = estimator.update(sample);
        }
        estimate
    }

    #[test]
    fn too_few_samples_has_no_confidence() {
        let mut estimator = BearingEstimator::new(BearingConfig::default());
        for i in 0..11 {
            let estimate = estimator.update(Sample::new(i as f64 * 0.1, -60.0, i as f64 * 30.0));
            assert_eq!(estimate.confidence, 0.0);
        }
        assert_eq!(estimator.status(), BearingStatus::InsufficientSamples);
        assert_eq!(estimator.estimate().angle_deg, None);
    }

    #[test]
    fn narrow_rotation_has_no_confidence() {
        let mut estimator = BearingEstimator::new(BearingConfig::default());
        for i in 0..40 {
            let heading = 100.0 + (i % 12) as f64 * 4.0;
            let rssi = if i % 3 == 0 { -45.0 } else { -80.0 };
            let estimate = estimator.update(Sample::new(i as f64 * 0.1, rssi, heading));
            assert_eq!(estimate.confidence, 0.0);
        }
        assert_eq!(estimator.status(), BearingStatus::InsufficientRotation);
    }

    #[test]
    fn converges_to_signal_peak() {
        let mut estimator = BearingEstimator::new(BearingConfig::default());
        let estimate = rotate(&mut estimator, 90.0, 3);
        let angle = estimate.angle_deg.unwrap();
        assert!(AngleMath::abs_angular_diff(angle, 90.0) < 10.0, "angle {}", angle);
        assert!(estimate.confidence > 0.35);
    }

    #[test]
    fn converges_across_north_seam() {
        let mut estimator = BearingEstimator::new(BearingConfig::default());
        let estimate = rotate(&mut estimator, 355.0, 3);
        let angle = estimate.angle_deg.unwrap();
        assert!(AngleMath::abs_angular_diff(angle, 355.0) < 10.0, "angle {}", angle);
    }

    #[test]
    fn old_samples_leave_the_window() {
        let mut estimator = BearingEstimator::new(BearingConfig::default());
        for i in 0..20 {
            estimator.update(Sample::new(i as f64 * 0.1, -60.0, 0.0));
        }
        estimator.update(Sample::new(100.0, -60.0, 0.0));
        assert_eq!(estimator.retained(), 1);
    }

    #[test]
    fn gate_keeps_previous_angle() {
        let config = BearingConfig {
            confidence_gate: 0.99,
            ..BearingConfig::default()
        };
        let mut estimator = BearingEstimator::new(config);
        let estimate = rotate(&mut estimator, 90.0, 2);
        assert_eq!(estimate.angle_deg, None);
        assert!(estimate.confidence > 0.0);
        assert_eq!(estimator.status(), BearingStatus::BelowGate);
    }

    #[test]
    fn incoherent_burst_keeps_last_fix() {
        let mut estimator = BearingEstimator::new(BearingConfig::default());
        let fixed = rotate(&mut estimator, 90.0, 3);
        let fixed_angle = fixed.angle_deg.unwrap();
        assert!(AngleMath::abs_angular_diff(fixed_angle, 90.0) < 10.0);

        // flat RSSI over a full turn carries no direction
        let mut last_updated = fixed_angle;
        let mut estimate = fixed;
        for j in 0..90 {
            let heading = AngleMath::normalize(j as f64 * 6.0);
            estimate = estimator.update(Sample::new(18.0 + j as f64 * 0.1, -70.0, heading));
            if estimator.status() == BearingStatus::Updated {
                last_updated = estimate.angle_deg.unwrap();
            }
        }

        assert_eq!(estimator.status(), BearingStatus::BelowGate);
        assert_eq!(estimate.angle_deg, Some(last_updated));
        assert!(AngleMath::abs_angular_diff(last_updated, 90.0) < 45.0, "angle {}", last_updated);
        assert!(estimate.confidence < 0.1, "confidence {}", estimate.confidence);
        assert!(estimate.confidence < fixed.confidence);
    }

    #[test]
    fn reset_forgets_fix() {
        let mut estimator = BearingEstimator::new(BearingConfig::default());
        rotate(&mut estimator, 200.0, 2);
        estimator.reset();
        assert_eq!(estimator.estimate(), BearingEstimate::default());
        assert_eq!(estimator.retained(), 0);
    }
}
