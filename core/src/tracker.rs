//! Single-writer facade that owns every estimation stage.
//!
//! Hosts push beacon samples, compass headings and clock ticks; each call
//! returns the outputs it produced. Nothing here blocks or performs I/O.

use crate::config::TrackerConfig;
use crate::interface::{
    BearingEstimate, CalibrationParams, CalibrationResult, DistanceEstimate, GuidanceUpdate,
    HitEvent, RadarBlip, Sample,
};
use crate::math::angle::AngleMath;
use crate::prelude::{ensure_finite, EstimationStage, Timestamp, TrackerError, TrackerResult};
use crate::processing::{
    BearingEstimator, BearingStatus, CalibrationRoutine, DistanceStage, GuidanceEngine,
    RobustFilter, SweepHitDetector,
};
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outputs produced by one accepted beacon sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleUpdate {
    pub smoothed_rssi: f64,
    pub distance: DistanceEstimate,
    pub bearing: BearingEstimate,
    pub bearing_status: BearingStatus,
    pub guidance: GuidanceUpdate,
}

/// Latest state of every output, for hosts that poll instead of reacting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub session_active: bool,
    pub calibrating: bool,
    pub heading_deg: Option<f64>,
    pub smoothed_rssi: Option<f64>,
    pub distance: Option<DistanceEstimate>,
    pub bearing: BearingEstimate,
    pub guidance: GuidanceUpdate,
    pub sweep_deg: f64,
    pub blip: Option<RadarBlip>,
    pub calibration: CalibrationParams,
    pub metrics: MetricsSnapshot,
}

pub struct Tracker {
    config: TrackerConfig,
    calibration: CalibrationParams,
    rssi: RobustFilter,
    distance: DistanceStage,
    bearing: BearingEstimator,
    sweep: SweepHitDetector,
    guidance: GuidanceEngine,
    heading: Option<f64>,
    session_active: bool,
    calibration_run: Option<CalibrationRoutine>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl Tracker {
    pub fn new(config: TrackerConfig, calibration: CalibrationParams) -> Self {
        Self {
            rssi: RobustFilter::new("rssi", config.rssi_filter.clone()),
            distance: DistanceStage::new(config.distance_filter.clone(), config.max_distance_m),
            bearing: BearingEstimator::new(config.bearing.clone()),
            sweep: SweepHitDetector::new(config.sweep.clone()),
            guidance: GuidanceEngine::new(config.guidance.clone()),
            config,
            calibration,
            heading: None,
            session_active: false,
            calibration_run: None,
            metrics: Arc::new(MetricsRecorder::new()),
            logger: LogManager::new("tracker"),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        Arc::clone(&self.metrics)
    }

    pub fn is_active(&self) -> bool {
        self.session_active
    }

    pub fn start_session(&mut self) {
        self.reset_stages();
        self.calibration_run = None;
        self.session_active = true;
        self.logger.record("session started");
    }

    pub fn stop_session(&mut self) {
        self.reset_stages();
        self.calibration_run = None;
        self.session_active = false;
        self.logger.record("session stopped");
    }

    fn reset_stages(&mut self) {
        let stages: [&mut dyn EstimationStage; 5] = [
            &mut self.rssi,
            &mut self.distance,
            &mut self.bearing,
            &mut self.sweep,
            &mut self.guidance,
        ];
        for stage in stages {
            stage.reset();
            self.logger.trace(&format!("reset {}", stage.name()));
        }
    }

    pub fn calibration(&self) -> CalibrationParams {
        self.calibration
    }

    pub fn set_calibration(&mut self, tx_power_at_1m: f64, path_loss_exponent: f64) -> TrackerResult<()> {
        self.calibration = CalibrationParams::new(tx_power_at_1m, path_loss_exponent)?;
        self.logger.record(&format!(
            "calibration set: tx {:.1} dBm, n {:.2}",
            tx_power_at_1m, path_loss_exponent
        ));
        Ok(())
    }

    pub fn on_heading_sample(&mut self, heading_deg: f64, timestamp: Timestamp) -> TrackerResult<GuidanceUpdate> {
        let heading = AngleMath::normalize(ensure_finite(heading_deg, "heading")?);
        ensure_finite(timestamp, "timestamp")?;
        self.heading = Some(heading);
        Ok(self.guide(timestamp))
    }

    pub fn on_beacon_sample(&mut self, rssi_dbm: f64, timestamp: Timestamp) -> TrackerResult<SampleUpdate> {
        if let Err(err) = ensure_finite(rssi_dbm, "rssi").and(ensure_finite(timestamp, "timestamp")) {
            self.metrics.record_rejected();
            return Err(err);
        }
        if !self.session_active {
            self.metrics.record_rejected();
            return Err(TrackerError::SessionInactive);
        }

        if let Some(run) = self.calibration_run.as_mut() {
            run.record(rssi_dbm, timestamp);
        }

        let smoothed_rssi = self.rssi.update(rssi_dbm);
        let distance = self.distance.update(smoothed_rssi, &self.calibration);
        let bearing = match self.heading {
            Some(heading) => self.bearing.update(Sample::new(timestamp, smoothed_rssi, heading)),
            None => self.bearing.estimate(),
        };
        let guidance = self.guide(timestamp);
        self.metrics.record_sample();

        Ok(SampleUpdate {
            smoothed_rssi,
            distance,
            bearing,
            bearing_status: self.bearing.status(),
            guidance,
        })
    }

    /// Advances the sweep and reports a hit when it crosses the target.
    pub fn on_clock_tick(&mut self, elapsed_secs: f64, now: Timestamp) -> TrackerResult<Option<HitEvent>> {
        let elapsed = ensure_finite(elapsed_secs, "elapsed")?;
        ensure_finite(now, "timestamp")?;
        if elapsed < 0.0 {
            return Err(TrackerError::InvalidInput(format!(
                "elapsed must not be negative, got {}",
                elapsed
            )));
        }
        self.sweep.tick(elapsed);

        if !self.session_active || self.distance.current().is_none() {
            return Ok(None);
        }
        let target = self.bearing.estimate().angle_deg.unwrap_or(0.0);
        let hit = self.sweep.check_hit(target, now);
        if hit.is_some() {
            self.metrics.record_hit();
        }
        Ok(hit)
    }

    /// Starts a one-meter calibration burst; clears the RSSI window so the
    /// burst is not clipped against readings from the previous range.
    pub fn begin_calibration(&mut self, now: Timestamp) -> TrackerResult<Timestamp> {
        ensure_finite(now, "timestamp")?;
        if !self.session_active {
            return Err(TrackerError::CalibrationUnavailable(
                "start scanning before calibrating".into(),
            ));
        }
        if self.calibration_run.is_some() {
            return Err(TrackerError::CalibrationUnavailable(
                "calibration already running".into(),
            ));
        }
        self.rssi.clear_window();
        let run = CalibrationRoutine::begin(now, &self.config.calibration);
        let deadline = run.deadline();
        self.calibration_run = Some(run);
        self.logger.record(&format!("calibration started, due at {:.2}", deadline));
        Ok(deadline)
    }

    /// Returns the calibration outcome once due, committing accepted results.
    pub fn poll_calibration(&mut self, now: Timestamp) -> Option<CalibrationResult> {
        let run = self.calibration_run.take()?;
        match run.finish(now) {
            Err(pending) => {
                self.calibration_run = Some(pending);
                None
            }
            Ok(result) => {
                if let Some(params) = CalibrationRoutine::apply(&result, &self.calibration) {
                    self.calibration = params;
                    self.logger.record(&format!(
                        "calibration accepted: tx {:.0} dBm from {} samples",
                        params.tx_power_at_1m, result.sample_count
                    ));
                } else {
                    self.logger.warn(&format!(
                        "calibration rejected: only {} samples",
                        result.sample_count
                    ));
                }
                self.metrics.record_calibration(result.accepted);
                Some(result)
            }
        }
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibration_run.is_some()
    }

    fn guide(&mut self, now: Timestamp) -> GuidanceUpdate {
        let estimate = self.bearing.estimate();
        let distance = self.distance.current().map(|d| d.meters);
        let decision = match self.heading {
            Some(heading) => self.guidance.evaluate(heading, &estimate, distance, now),
            None => self.guidance.evaluate(0.0, &estimate, None, now),
        };
        if decision.committed {
            self.metrics.record_commit(decision.update.should_announce);
        } else if decision.update.should_announce {
            self.metrics.record_announcement();
        }
        decision.update
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        let distance = self.distance.current();
        let bearing = self.bearing.estimate();
        let state = self.guidance.state();
        TrackingSnapshot {
            session_active: self.session_active,
            calibrating: self.is_calibrating(),
            heading_deg: self.heading,
            smoothed_rssi: self.rssi.value(),
            distance,
            bearing,
            guidance: GuidanceUpdate {
                instruction: state.instruction,
                arrow: state.arrow,
                should_announce: false,
            },
            sweep_deg: self.sweep.angle(),
            blip: distance.map(|d| RadarBlip::place(d.meters, bearing.angle_deg)),
            calibration: self.calibration,
            metrics: self.metrics.snapshot(),
        }
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default(), CalibrationParams::default())
    }
}
