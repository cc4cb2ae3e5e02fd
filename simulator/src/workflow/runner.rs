use crate::generator::scenario::{build_event_stream, ScenarioConfig, ScenarioEvent};
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tagradarcore::interface::{ArrowSymbol, CalibrationParams, CalibrationResult, Instruction, TagMatcher};
use tagradarcore::{Tracker, TrackingSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionChange {
    pub t: f64,
    pub instruction: Instruction,
    pub arrow: Option<ArrowSymbol>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub final_snapshot: TrackingSnapshot,
    pub true_bearing_deg: f64,
    pub true_distance_m: f64,
    pub instruction_changes: Vec<InstructionChange>,
    pub announcements: usize,
    pub hits: usize,
    pub forwarded: usize,
    pub filtered: usize,
    pub rejected: usize,
    pub calibration: Option<CalibrationResult>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    calibration: CalibrationParams,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self::with_calibration(config, CalibrationParams::default())
    }

    pub fn with_calibration(config: WorkflowConfig, calibration: CalibrationParams) -> Self {
        Self { config, calibration }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn run(&self) -> anyhow::Result<WorkflowResult> {
        self.run_scenario(&self.config.scenario)
    }

    pub fn run_scenario(&self, scenario: &ScenarioConfig) -> anyhow::Result<WorkflowResult> {
        let events = build_event_stream(scenario).context("building scenario events")?;
        self.execute(scenario, &events)
    }

    /// Replays `events` through a fresh tracker, playing the host's role:
    /// filtering advertisements by tag, starting the session and polling
    /// calibration on every frame.
    pub fn execute(&self, scenario: &ScenarioConfig, events: &[ScenarioEvent]) -> anyhow::Result<WorkflowResult> {
        let matcher = TagMatcher::new(&scenario.tag_code);
        let mut tracker = Tracker::new(self.config.tracker.clone(), self.calibration);
        tracker.start_session();

        let start = events.first().map(ScenarioEvent::time).unwrap_or(0.0);
        if scenario.calibration_secs.is_some() {
            tracker
                .begin_calibration(start)
                .context("starting calibration burst")?;
        }

        let mut changes: Vec<InstructionChange> = Vec::new();
        let mut calibration = None;
        let mut announcements = 0;
        let mut hits = 0;
        let mut forwarded = 0;
        let mut filtered = 0;
        let mut rejected = 0;
        let mut last_t = start;

        for event in events {
            last_t = event.time();
            let guidance = match event {
                ScenarioEvent::Heading { t, heading } => Some(
                    tracker
                        .on_heading_sample(*heading, *t)
                        .context("applying heading sample")?,
                ),
                ScenarioEvent::Advertisement { t, name, rssi } => {
                    if !matcher.matches(name) {
                        filtered += 1;
                        continue;
                    }
                    match tracker.on_beacon_sample(*rssi, *t) {
                        Ok(update) => {
                            forwarded += 1;
                            Some(update.guidance)
                        }
                        Err(err) => {
                            warn!("sample at {:.2}s rejected: {}", t, err);
                            rejected += 1;
                            None
                        }
                    }
                }
                ScenarioEvent::Frame { t, elapsed } => {
                    if tracker
                        .on_clock_tick(*elapsed, *t)
                        .context("advancing sweep")?
                        .is_some()
                    {
                        hits += 1;
                    }
                    if calibration.is_none() {
                        calibration = tracker.poll_calibration(*t);
                    }
                    None
                }
            };

            if let Some(update) = guidance {
                if update.should_announce {
                    announcements += 1;
                    debug!("announce at {:.2}s: {}", last_t, update.instruction.phrase());
                }
                if changes.last().map(|c| c.instruction) != Some(update.instruction) {
                    changes.push(InstructionChange {
                        t: last_t,
                        instruction: update.instruction,
                        arrow: update.arrow,
                    });
                }
            }
        }

        let final_snapshot = tracker.snapshot();
        tracker.stop_session();

        Ok(WorkflowResult {
            final_snapshot,
            true_bearing_deg: scenario.tag_bearing_deg,
            true_distance_m: scenario.pose_at(last_t).distance_m,
            instruction_changes: changes,
            announcements,
            hits,
            forwarded,
            filtered,
            rejected,
            calibration,
        })
    }
}
