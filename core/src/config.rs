//! Tunable constants for every estimation stage.
//!
//! The defaults are empirical; hosts may override any of them (for example
//! from a workflow YAML file) without touching the algorithms.

use serde::{Deserialize, Deserializer, Serialize};

/// Outlier clipping and smoothing for one scalar stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub window: usize,
    pub alpha: f64,
    /// Half-width of the accepted band, in MADs around the window median.
    pub clip_mads: f64,
    /// Substitute for a zero MAD.
    pub mad_floor: f64,
    /// Minimum published change; `0.0` disables the deadband.
    pub deadband: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::rssi()
    }
}

impl FilterConfig {
    pub fn rssi() -> Self {
        Self {
            window: 25,
            alpha: 0.25,
            clip_mads: 3.0,
            mad_floor: 1.0,
            deadband: 0.0,
        }
    }

    pub fn distance() -> Self {
        Self {
            window: 40,
            alpha: 0.15,
            clip_mads: 3.0,
            mad_floor: 1.0,
            deadband: 0.05,
        }
    }
}

/// Partially specified [`FilterConfig`], filled from a stream-specific base.
#[derive(Debug, Deserialize)]
struct FilterOverrides {
    window: Option<usize>,
    alpha: Option<f64>,
    clip_mads: Option<f64>,
    mad_floor: Option<f64>,
    deadband: Option<f64>,
}

impl FilterOverrides {
    fn apply(self, base: FilterConfig) -> FilterConfig {
        FilterConfig {
            window: self.window.unwrap_or(base.window),
            alpha: self.alpha.unwrap_or(base.alpha),
            clip_mads: self.clip_mads.unwrap_or(base.clip_mads),
            mad_floor: self.mad_floor.unwrap_or(base.mad_floor),
            deadband: self.deadband.unwrap_or(base.deadband),
        }
    }
}

fn distance_filter<'de, D>(deserializer: D) -> Result<FilterConfig, D::Error>
where
    D: Deserializer<'de>,
{
    FilterOverrides::deserialize(deserializer).map(|overrides| overrides.apply(FilterConfig::distance()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BearingConfig {
    pub window_secs: f64,
    pub min_samples: usize,
    pub min_spread_deg: f64,
    pub confidence_gate: f64,
    /// Weight of the newest direction when blending the smoothed vector.
    pub blend: f64,
    pub mad_floor: f64,
}

impl Default for BearingConfig {
    fn default() -> Self {
        Self {
            window_secs: 6.0,
            min_samples: 12,
            min_spread_deg: 60.0,
            confidence_gate: 0.35,
            blend: 0.18,
            mad_floor: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub rate_deg_per_sec: f64,
    pub tolerance_deg: f64,
    pub min_interval_ms: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            rate_deg_per_sec: 120.0,
            tolerance_deg: 10.0,
            min_interval_ms: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    pub confidence_gate: f64,
    pub arrived_within_m: f64,
    pub straight_deg: f64,
    pub slight_deg: f64,
    pub turn_deg: f64,
    pub hysteresis_deg: f64,
    pub min_dwell_secs: f64,
    pub min_announce_secs: f64,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            confidence_gate: 0.35,
            arrived_within_m: 1.5,
            straight_deg: 15.0,
            slight_deg: 35.0,
            turn_deg: 100.0,
            hysteresis_deg: 6.0,
            min_dwell_secs: 1.2,
            min_announce_secs: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub duration_secs: f64,
    pub min_samples: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration_secs: 3.0,
            min_samples: 10,
        }
    }
}

/// Complete configuration of a [`crate::tracker::Tracker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub rssi_filter: FilterConfig,
    /// Missing fields fall back to [`FilterConfig::distance`], not the RSSI defaults.
    #[serde(deserialize_with = "distance_filter")]
    pub distance_filter: FilterConfig,
    pub bearing: BearingConfig,
    pub sweep: SweepConfig,
    pub guidance: GuidanceConfig,
    pub calibration: CalibrationConfig,
    /// Distance ceiling of the path-loss model, in meters.
    pub max_distance_m: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            rssi_filter: FilterConfig::rssi(),
            distance_filter: FilterConfig::distance(),
            bearing: BearingConfig::default(),
            sweep: SweepConfig::default(),
            guidance: GuidanceConfig::default(),
            calibration: CalibrationConfig::default(),
            max_distance_m: 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rssi_reacts_faster_than_distance() {
        let config = TrackerConfig::default();
        assert!(config.rssi_filter.alpha > config.distance_filter.alpha);
        assert_eq!(config.rssi_filter.deadband, 0.0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{"bearing": {"confidence_gate": 0.5}}"#).unwrap();
        assert_eq!(config.bearing.confidence_gate, 0.5);
        assert_eq!(config.bearing.min_samples, 12);
        assert_eq!(config.distance_filter, FilterConfig::distance());
    }

    #[test]
    fn partial_distance_filter_keeps_distance_defaults() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{"distance_filter": {"deadband": 0.1}}"#).unwrap();
        assert_eq!(config.distance_filter.deadband, 0.1);
        assert_eq!(config.distance_filter.alpha, 0.15);
        assert_eq!(config.distance_filter.window, 40);
        assert!(config.rssi_filter.alpha > config.distance_filter.alpha);
    }

    #[test]
    fn partial_rssi_filter_keeps_rssi_defaults() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{"rssi_filter": {"window": 31}}"#).unwrap();
        assert_eq!(config.rssi_filter.window, 31);
        assert_eq!(config.rssi_filter.alpha, 0.25);
    }
}
