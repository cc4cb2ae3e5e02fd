use crate::math::angle::AngleMath;
use serde::{Deserialize, Serialize};

/// Coarse distance classes used for colouring and haptic intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProximityBand {
    Immediate,
    Near,
    Mid,
    Far,
}

impl ProximityBand {
    pub fn from_meters(meters: f64) -> Self {
        if meters < 2.0 {
            ProximityBand::Immediate
        } else if meters < 5.0 {
            ProximityBand::Near
        } else if meters < 10.0 {
            ProximityBand::Mid
        } else {
            ProximityBand::Far
        }
    }
}

/// Range shown at the rim of the radar disc.
pub const RADAR_RANGE_M: f64 = 20.0;

/// Target position on a unit radar disc: observer at the origin, north up,
/// `x` growing to the right and `y` growing upwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadarBlip {
    /// Radius as a fraction of the disc, in `[0, 1]`.
    pub radius: f64,
    pub angle_deg: f64,
    pub x: f64,
    pub y: f64,
    pub band: ProximityBand,
}

impl RadarBlip {
    /// Places the blip; without a bearing fix the blip sits at the top (0°).
    pub fn place(meters: f64, bearing_deg: Option<f64>) -> Self {
        let radius = (meters / RADAR_RANGE_M).clamp(0.0, 1.0);
        let angle_deg = AngleMath::normalize(bearing_deg.unwrap_or(0.0));
        let theta = AngleMath::to_radians(angle_deg);
        Self {
            radius,
            angle_deg,
            x: radius * theta.sin(),
            y: radius * theta.cos(),
            band: ProximityBand::from_meters(meters),
        }
    }
}
