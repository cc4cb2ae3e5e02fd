use crate::generator::scenario::ScenarioConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tagradarcore::TrackerConfig;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub tracker: TrackerConfig,
    pub scenario: ScenarioConfig,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        tag_code: &str,
        tag_bearing_deg: f64,
        start_distance_m: f64,
        seed: u64,
        calibrate: bool,
    ) -> Self {
        let tracker = TrackerConfig::default();
        let calibration_secs = calibrate.then(|| tracker.calibration.duration_secs + 0.5);
        Self {
            tracker,
            scenario: ScenarioConfig {
                tag_code: tag_code.to_string(),
                tag_bearing_deg,
                start_distance_m,
                seed,
                calibration_secs,
                ..Default::default()
            },
        }
    }
}
