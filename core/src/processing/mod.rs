pub mod bearing;
pub mod calibration;
pub mod distance;
pub mod guidance;
pub mod robust_filter;
pub mod sweep;
pub mod window;

pub use bearing::{BearingEstimator, BearingStatus};
pub use calibration::CalibrationRoutine;
pub use distance::{DistanceEstimator, DistanceStage};
pub use guidance::{GuidanceDecision, GuidanceEngine, GuidanceState};
pub use robust_filter::RobustFilter;
pub use sweep::{SweepHitDetector, SweepState};
pub use window::BoundedWindow;
