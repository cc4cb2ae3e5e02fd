pub mod angle;
pub mod stats;

pub use angle::AngleMath;
pub use stats::StatsHelper;
