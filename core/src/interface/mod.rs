pub mod events;
pub mod radar;
pub mod sample;
pub mod tag;

pub use events::{
    ArrowSymbol, BearingEstimate, DistanceEstimate, GuidanceUpdate, HitEvent, Instruction,
};
pub use radar::{ProximityBand, RadarBlip};
pub use sample::{CalibrationParams, CalibrationResult, Sample};
pub use tag::TagMatcher;
