use crate::workflow::runner::WorkflowResult;
use serde::{Deserialize, Serialize};
use tagradarcore::interface::{
    CalibrationParams, CalibrationResult, GuidanceUpdate, HitEvent, Instruction, TagMatcher,
};
use tagradarcore::queue::TrackerEvent;

/// Event posted by a live host. Advertisements carry the advertised name so
/// the bridge can drop foreign beacons before they reach the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    Advertisement { name: String, rssi: f64, timestamp: f64 },
    Heading { heading: f64, timestamp: f64 },
    Tick { elapsed: f64, now: f64 },
    StartSession,
    StopSession,
    SetCalibration { tx_power_at_1m: f64, path_loss_exponent: f64 },
    BeginCalibration { now: f64 },
    PollCalibration { now: f64 },
}

impl HostEvent {
    /// Returns `None` for advertisements from a tag other than the bound one.
    pub fn into_tracker_event(self, matcher: &TagMatcher) -> Option<TrackerEvent> {
        let event = match self {
            HostEvent::Advertisement { name, rssi, timestamp } => {
                if !matcher.matches(&name) {
                    return None;
                }
                TrackerEvent::Beacon { rssi, timestamp }
            }
            HostEvent::Heading { heading, timestamp } => TrackerEvent::Heading { heading, timestamp },
            HostEvent::Tick { elapsed, now } => TrackerEvent::Tick { elapsed, now },
            HostEvent::StartSession => TrackerEvent::StartSession,
            HostEvent::StopSession => TrackerEvent::StopSession,
            HostEvent::SetCalibration {
                tx_power_at_1m,
                path_loss_exponent,
            } => TrackerEvent::SetCalibration(CalibrationParams {
                tx_power_at_1m,
                path_loss_exponent,
            }),
            HostEvent::BeginCalibration { now } => TrackerEvent::BeginCalibration { now },
            HostEvent::PollCalibration { now } => TrackerEvent::PollCalibration { now },
        };
        Some(event)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub scenario: Option<String>,
    pub instruction: Instruction,
    pub distance_m: Option<f64>,
    pub true_distance_m: f64,
    pub bearing_deg: Option<f64>,
    pub true_bearing_deg: f64,
    pub confidence: f64,
    pub instruction_changes: usize,
    pub announcements: usize,
    pub hits: usize,
    pub calibration: Option<CalibrationResult>,
}

impl RunSummary {
    pub fn from_result(scenario: Option<String>, result: &WorkflowResult) -> Self {
        let snapshot = &result.final_snapshot;
        Self {
            scenario,
            instruction: snapshot.guidance.instruction,
            distance_m: snapshot.distance.map(|d| d.meters),
            true_distance_m: result.true_distance_m,
            bearing_deg: snapshot.bearing.angle_deg,
            true_bearing_deg: result.true_bearing_deg,
            confidence: snapshot.bearing.confidence,
            instruction_changes: result.instruction_changes.len(),
            announcements: result.announcements,
            hits: result.hits,
            calibration: result.calibration,
        }
    }
}

/// What the bridge has seen so far, served on `/model`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeModel {
    pub last_run: Option<RunSummary>,
    pub forwarded: usize,
    pub filtered: usize,
    pub rejected: usize,
    pub hits: usize,
    pub last_guidance: Option<GuidanceUpdate>,
    pub last_hit: Option<HitEvent>,
    pub last_calibration: Option<CalibrationResult>,
}
