//! Estimation core for locating a BLE tag with RSSI and a compass.
//!
//! Raw RSSI is cleaned by a median/MAD clip and an EMA, converted to distance
//! with a log-distance path-loss model, and correlated with the observer's
//! heading to estimate a bearing. A hysteresis-gated guidance engine turns
//! the result into stable instructions, and a radar sweep reports hits on
//! the estimated direction.

pub mod config;
pub mod interface;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod queue;
pub mod telemetry;
pub mod tracker;

pub use config::TrackerConfig;
pub use prelude::{EstimationStage, TrackerError, TrackerResult};
pub use tracker::{SampleUpdate, Tracker, TrackingSnapshot};
