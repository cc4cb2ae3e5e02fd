use crate::config::SweepConfig;
use crate::interface::HitEvent;
use crate::math::angle::AngleMath;
use crate::prelude::{EstimationStage, Timestamp};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SweepState {
    pub angle_deg: f64,
    pub last_hit: Option<Timestamp>,
}

/// Free-running radar sweep that pulses when it crosses the target direction.
pub struct SweepHitDetector {
    config: SweepConfig,
    state: SweepState,
}

impl SweepHitDetector {
    pub fn new(config: SweepConfig) -> Self {
        Self {
            config,
            state: SweepState::default(),
        }
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    pub fn angle(&self) -> f64 {
        self.state.angle_deg
    }

    /// Integrates the sweep angle over `elapsed_secs` at `rate_deg_per_sec`.
    pub fn advance(&mut self, elapsed_secs: f64, rate_deg_per_sec: f64) -> f64 {
        self.state.angle_deg = AngleMath::normalize(self.state.angle_deg + rate_deg_per_sec * elapsed_secs);
        self.state.angle_deg
    }

    /// Advances at the configured rate.
    pub fn tick(&mut self, elapsed_secs: f64) -> f64 {
        self.advance(elapsed_secs, self.config.rate_deg_per_sec)
    }

    /// Reports a hit when the beam is within tolerance of `target_deg` and
    /// the previous hit is older than the minimum interval.
    pub fn check_hit(&mut self, target_deg: f64, now: Timestamp) -> Option<HitEvent> {
        let inside = AngleMath::abs_angular_diff(self.state.angle_deg, target_deg) < self.config.tolerance_deg;
        if !inside {
            return None;
        }
        let min_interval_secs = self.config.min_interval_ms / 1000.0;
        if let Some(last) = self.state.last_hit {
            if now - last <= min_interval_secs {
                return None;
            }
        }
        self.state.last_hit = Some(now);
        Some(HitEvent {
            sweep_deg: self.state.angle_deg,
            target_deg: AngleMath::normalize(target_deg),
        })
    }
}

impl EstimationStage for SweepHitDetector {
    fn name(&self) -> &'static str {
        "sweep"
    }

    /// Only the hit timer is session state; the beam keeps turning.
    fn reset(&mut self) {
        self.state.last_hit = None;
    }
}
