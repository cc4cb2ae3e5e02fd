//! Turn-by-turn guidance with hysteresis and a minimum dwell time.

use crate::config::GuidanceConfig;
use crate::interface::{ArrowSymbol, BearingEstimate, GuidanceUpdate, Instruction};
use crate::math::angle::AngleMath;
use crate::prelude::{EstimationStage, Timestamp};
use crate::telemetry::log::LogManager;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidanceState {
    pub instruction: Instruction,
    pub arrow: Option<ArrowSymbol>,
    pub last_change: Option<Timestamp>,
    pub last_announce: Option<Timestamp>,
    /// Whether the current instruction has been announced yet.
    pub announced: bool,
}

impl Default for GuidanceState {
    fn default() -> Self {
        Self {
            instruction: Instruction::AwaitingFix,
            arrow: None,
            last_change: None,
            last_announce: None,
            announced: true,
        }
    }
}

/// Result of one guidance tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidanceDecision {
    pub update: GuidanceUpdate,
    pub committed: bool,
    /// Signed offset from heading to bearing, when one could be computed.
    pub delta_deg: Option<f64>,
}

pub struct GuidanceEngine {
    config: GuidanceConfig,
    state: GuidanceState,
    logger: LogManager,
}

impl GuidanceEngine {
    pub fn new(config: GuidanceConfig) -> Self {
        Self {
            config,
            state: GuidanceState::default(),
            logger: LogManager::new("guidance"),
        }
    }

    pub fn state(&self) -> GuidanceState {
        self.state
    }

    /// Candidate instruction for the inputs, before the dwell rule applies.
    pub fn classify(
        &self,
        heading_deg: f64,
        bearing: &BearingEstimate,
        distance_m: Option<f64>,
    ) -> (Instruction, Option<f64>) {
        let (Some(distance), Some(target)) = (distance_m, bearing.angle_deg) else {
            return (Instruction::AwaitingFix, None);
        };
        // same gate as the bearing stage: a fix must exceed it to be trusted
        if bearing.confidence <= self.config.confidence_gate {
            return (Instruction::Rotate360, None);
        }

        let delta = self.apply_hysteresis(AngleMath::shortest_signed_diff(heading_deg, target));
        (self.map_delta(delta, distance), Some(delta))
    }

    /// Pulls `delta` back under the outer threshold of the current slight/turn
    /// instruction while it overshoots that threshold by less than the band.
    fn apply_hysteresis(&self, delta: f64) -> f64 {
        let previous = self.state.instruction;
        let threshold = if previous.is_slight() {
            self.config.slight_deg
        } else if previous.is_turn() {
            self.config.turn_deg
        } else {
            return delta;
        };

        let magnitude = delta.abs();
        if magnitude > threshold && magnitude <= threshold + self.config.hysteresis_deg {
            threshold.copysign(delta)
        } else {
            delta
        }
    }

    fn map_delta(&self, delta: f64, distance: f64) -> Instruction {
        let magnitude = delta.abs();
        let right = delta >= 0.0;
        if distance < self.config.arrived_within_m {
            Instruction::Arrived
        } else if magnitude <= self.config.straight_deg {
            Instruction::GoStraight
        } else if magnitude <= self.config.slight_deg {
            if right {
                Instruction::SlightRight
            } else {
                Instruction::SlightLeft
            }
        } else if magnitude <= self.config.turn_deg {
            if right {
                Instruction::TurnRight
            } else {
                Instruction::TurnLeft
            }
        } else {
            Instruction::Behind
        }
    }

    pub fn evaluate(
        &mut self,
        heading_deg: f64,
        bearing: &BearingEstimate,
        distance_m: Option<f64>,
        now: Timestamp,
    ) -> GuidanceDecision {
        let (candidate, delta) = self.classify(heading_deg, bearing, distance_m);

        let dwell_elapsed = self
            .state
            .last_change
            .map_or(true, |t| now - t >= self.config.min_dwell_secs);
        let committed = candidate != self.state.instruction && dwell_elapsed;
        if committed {
            self.state.instruction = candidate;
            self.state.arrow = delta.map(ArrowSymbol::from_delta);
            self.state.last_change = Some(now);
            self.state.announced = false;
            self.logger.record(&format!(
                "instruction -> {:?} (delta {:?})",
                candidate, delta
            ));
        }

        let announce_ready = self
            .state
            .last_announce
            .map_or(true, |t| now - t >= self.config.min_announce_secs);
        let should_announce = !self.state.announced && announce_ready;
        if should_announce {
            self.state.announced = true;
            self.state.last_announce = Some(now);
        }

        GuidanceDecision {
            update: GuidanceUpdate {
                instruction: self.state.instruction,
                arrow: self.state.arrow,
                should_announce,
            },
            committed,
            delta_deg: delta,
        }
    }

    pub fn update(
        &mut self,
        heading_deg: f64,
        bearing: &BearingEstimate,
        distance_m: Option<f64>,
        now: Timestamp,
    ) -> GuidanceUpdate {
        self.evaluate(heading_deg, bearing, distance_m, now).update
    }
}

impl EstimationStage for GuidanceEngine {
    fn name(&self) -> &'static str {
        "guidance"
    }

    fn reset(&mut self) {
        self.state = GuidanceState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(angle: f64) -> BearingEstimate {
        BearingEstimate {
            angle_deg: Some(angle),
            confidence: 0.8,
        }
    }

    fn engine() -> GuidanceEngine {
        GuidanceEngine::new(GuidanceConfig::default())
    }

    #[test]
    fn straight_ahead() {
        let mut engine = engine();
        let update = engine.update(40.0, &fix(40.0), Some(5.0), 0.0);
        assert_eq!(update.instruction, Instruction::GoStraight);
        assert_eq!(update.arrow, Some(ArrowSymbol::Ahead));
        assert!(update.should_announce);
    }

    #[test]
    fn arrived_regardless_of_delta() {
        for target in [0.0, 90.0, 180.0, 300.0] {
            let mut engine = engine();
            let update = engine.update(0.0, &fix(target), Some(1.0), 0.0);
            assert_eq!(update.instruction, Instruction::Arrived);
        }
    }

    #[test]
    fn missing_inputs_await_fix() {
        let engine = engine();
        assert_eq!(
            engine.classify(0.0, &BearingEstimate::default(), Some(3.0)).0,
            Instruction::AwaitingFix
        );
        assert_eq!(engine.classify(0.0, &fix(10.0), None).0, Instruction::AwaitingFix);
        let weak = BearingEstimate {
            angle_deg: Some(10.0),
            confidence: 0.2,
        };
        assert_eq!(engine.classify(0.0, &weak, Some(3.0)).0, Instruction::Rotate360);
    }

    #[test]
    fn confidence_at_gate_still_rotates() {
        let engine = engine();
        let at_gate = BearingEstimate {
            angle_deg: Some(10.0),
            confidence: GuidanceConfig::default().confidence_gate,
        };
        assert_eq!(engine.classify(0.0, &at_gate, Some(3.0)).0, Instruction::Rotate360);
        let above = BearingEstimate {
            confidence: 0.36,
            ..at_gate
        };
        assert_eq!(engine.classify(0.0, &above, Some(3.0)).0, Instruction::GoStraight);
    }

    #[test]
    fn delta_maps_to_instruction() {
        let engine = engine();
        let cases = [
            (15.0, Instruction::GoStraight),
            (20.0, Instruction::SlightRight),
            (-35.0, Instruction::SlightLeft),
            (60.0, Instruction::TurnRight),
            (-100.0, Instruction::TurnLeft),
            (120.0, Instruction::Behind),
            (-170.0, Instruction::Behind),
        ];
        for (offset, expected) in cases {
            let target = AngleMath::normalize(200.0 + offset);
            assert_eq!(engine.classify(200.0, &fix(target), Some(8.0)).0, expected, "{}", offset);
        }
    }

    #[test]
    fn dwell_blocks_second_commit() {
        let mut engine = engine();
        let first = engine.evaluate(0.0, &fix(0.0), Some(5.0), 10.0);
        assert!(first.committed);
        let second = engine.evaluate(0.0, &fix(70.0), Some(5.0), 10.5);
        assert!(!second.committed);
        assert_eq!(second.update.instruction, Instruction::GoStraight);
        let later = engine.evaluate(0.0, &fix(70.0), Some(5.0), 11.3);
        assert!(later.committed);
        assert_eq!(later.update.instruction, Instruction::TurnRight);
        assert_eq!(later.update.arrow, Some(ArrowSymbol::Right));
    }

    #[test]
    fn hysteresis_holds_slight_past_threshold() {
        let mut engine = engine();
        engine.update(0.0, &fix(30.0), Some(5.0), 0.0);
        assert_eq!(engine.state().instruction, Instruction::SlightRight);
        let held = engine.update(0.0, &fix(39.0), Some(5.0), 5.0);
        assert_eq!(held.instruction, Instruction::SlightRight);
        let crossed = engine.update(0.0, &fix(42.0), Some(5.0), 10.0);
        assert_eq!(crossed.instruction, Instruction::TurnRight);
    }

    #[test]
    fn hysteresis_only_after_slight_or_turn() {
        let mut engine = engine();
        engine.update(0.0, &fix(0.0), Some(5.0), 0.0);
        let update = engine.update(0.0, &fix(39.0), Some(5.0), 5.0);
        assert_eq!(update.instruction, Instruction::TurnRight);
        let held = engine.update(0.0, &fix(254.0), Some(5.0), 10.0);
        assert_eq!(held.instruction, Instruction::TurnLeft);
    }

    #[test]
    fn announcements_are_rate_limited_but_not_lost() {
        let mut engine = engine();
        assert!(engine.update(0.0, &fix(0.0), Some(5.0), 0.0).should_announce);
        let turned = engine.update(0.0, &fix(70.0), Some(5.0), 1.3);
        assert_eq!(turned.instruction, Instruction::TurnRight);
        assert!(!turned.should_announce);
        assert!(!engine.update(0.0, &fix(70.0), Some(5.0), 1.8).should_announce);
        assert!(engine.update(0.0, &fix(70.0), Some(5.0), 2.1).should_announce);
        assert!(!engine.update(0.0, &fix(70.0), Some(5.0), 5.0).should_announce);
    }

    #[test]
    fn reset_returns_to_awaiting_fix() {
        let mut engine = engine();
        engine.update(0.0, &fix(0.0), Some(5.0), 0.0);
        engine.reset();
        assert_eq!(engine.state(), GuidanceState::default());
    }
}
