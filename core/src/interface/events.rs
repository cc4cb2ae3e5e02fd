use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceEstimate {
    pub meters: f64,
}

/// Absolute bearing toward the tag. `angle_deg` is `None` until the first fix.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BearingEstimate {
    pub angle_deg: Option<f64>,
    pub confidence: f64,
}

/// Emitted when the radar sweep passes over the target direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    pub sweep_deg: f64,
    pub target_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Instruction {
    #[default]
    AwaitingFix,
    Rotate360,
    GoStraight,
    SlightRight,
    SlightLeft,
    TurnRight,
    TurnLeft,
    Behind,
    Arrived,
}

impl Instruction {
    pub fn is_slight(self) -> bool {
        matches!(self, Instruction::SlightLeft | Instruction::SlightRight)
    }

    pub fn is_turn(self) -> bool {
        matches!(self, Instruction::TurnLeft | Instruction::TurnRight)
    }

    /// Short phrase suitable for a voice prompt.
    pub fn phrase(self) -> &'static str {
        match self {
            Instruction::AwaitingFix => "waiting for signal",
            Instruction::Rotate360 => "turn slowly all the way around",
            Instruction::GoStraight => "go straight",
            Instruction::SlightRight => "bear right",
            Instruction::SlightLeft => "bear left",
            Instruction::TurnRight => "turn right",
            Instruction::TurnLeft => "turn left",
            Instruction::Behind => "turn around",
            Instruction::Arrived => "you have arrived",
        }
    }
}

/// Eight 45° wide arrow buckets relative to straight ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrowSymbol {
    Ahead,
    AheadRight,
    Right,
    BehindRight,
    Behind,
    BehindLeft,
    Left,
    AheadLeft,
}

impl ArrowSymbol {
    /// Bucket for a signed offset in degrees (positive = clockwise).
    pub fn from_delta(delta_deg: f64) -> Self {
        let magnitude = delta_deg.abs();
        let right = delta_deg >= 0.0;
        if magnitude <= 22.5 {
            ArrowSymbol::Ahead
        } else if magnitude <= 67.5 {
            if right {
                ArrowSymbol::AheadRight
            } else {
                ArrowSymbol::AheadLeft
            }
        } else if magnitude <= 112.5 {
            if right {
                ArrowSymbol::Right
            } else {
                ArrowSymbol::Left
            }
        } else if magnitude <= 157.5 {
            if right {
                ArrowSymbol::BehindRight
            } else {
                ArrowSymbol::BehindLeft
            }
        } else {
            ArrowSymbol::Behind
        }
    }

    pub fn glyph(self) -> char {
        match self {
            ArrowSymbol::Ahead => '↑',
            ArrowSymbol::AheadRight => '↗',
            ArrowSymbol::Right => '→',
            ArrowSymbol::BehindRight => '↘',
            ArrowSymbol::Behind => '↓',
            ArrowSymbol::BehindLeft => '↙',
            ArrowSymbol::Left => '←',
            ArrowSymbol::AheadLeft => '↖',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuidanceUpdate {
    pub instruction: Instruction,
    pub arrow: Option<ArrowSymbol>,
    pub should_announce: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_octant_boundaries() {
        assert_eq!(ArrowSymbol::from_delta(0.0), ArrowSymbol::Ahead);
        assert_eq!(ArrowSymbol::from_delta(22.5), ArrowSymbol::Ahead);
        assert_eq!(ArrowSymbol::from_delta(23.0), ArrowSymbol::AheadRight);
        assert_eq!(ArrowSymbol::from_delta(-40.0), ArrowSymbol::AheadLeft);
        assert_eq!(ArrowSymbol::from_delta(90.0), ArrowSymbol::Right);
        assert_eq!(ArrowSymbol::from_delta(-112.0), ArrowSymbol::Left);
        assert_eq!(ArrowSymbol::from_delta(130.0), ArrowSymbol::BehindRight);
        assert_eq!(ArrowSymbol::from_delta(-157.5), ArrowSymbol::BehindLeft);
        assert_eq!(ArrowSymbol::from_delta(180.0), ArrowSymbol::Behind);
        assert_eq!(ArrowSymbol::from_delta(-170.0), ArrowSymbol::Behind);
    }

    #[test]
    fn bearing_without_fix_is_distinct_from_north() {
        let none = BearingEstimate::default();
        let north = BearingEstimate {
            angle_deg: Some(0.0),
            confidence: 0.0,
        };
        assert_ne!(none, north);
        let json = serde_json::to_string(&none).unwrap();
        assert!(json.contains("\"angle_deg\":null"));
    }
}
