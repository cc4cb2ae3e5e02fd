use crate::generator::template::{body_shadow_db, path_loss_rssi, scan_wobble};
use anyhow::{ensure, Context};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tagradarcore::math::AngleMath;

/// Longest scenario a single replay accepts.
pub const MAX_SCENARIO_SECS: f64 = 600.0;

/// Shortest spacing between generated events of one kind.
pub const MIN_EVENT_INTERVAL_SECS: f64 = 0.001;

/// Synthetic search: optional one-meter calibration hold, a rotation on the
/// spot, then a walk toward the tag while scanning side to side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub tag_code: String,
    pub tag_bearing_deg: f64,
    pub start_distance_m: f64,
    pub min_distance_m: f64,
    /// Ground-truth radio environment, independent of the tracker calibration.
    pub tx_power_at_1m: f64,
    pub path_loss_exponent: f64,
    pub body_shadow_db: f64,
    pub noise_db: f64,
    pub outlier_probability: f64,
    pub outlier_drop_db: f64,
    pub rotation_rate_deg_per_sec: f64,
    pub rotation_secs: f64,
    pub walk_speed_mps: f64,
    pub scan_amplitude_deg: f64,
    pub scan_period_secs: f64,
    pub duration_secs: f64,
    pub advert_interval_secs: f64,
    pub heading_interval_secs: f64,
    pub frame_interval_secs: f64,
    pub foreign_advert_ratio: f64,
    /// Length of the initial hold at one meter; `None` skips calibration.
    pub calibration_secs: Option<f64>,
    pub seed: u64,
    pub description: Option<String>,
    pub scenario: Option<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            tag_code: "TAG01".into(),
            tag_bearing_deg: 135.0,
            start_distance_m: 12.0,
            min_distance_m: 0.3,
            tx_power_at_1m: -59.0,
            path_loss_exponent: 2.2,
            body_shadow_db: 10.0,
            noise_db: 2.0,
            outlier_probability: 0.03,
            outlier_drop_db: 15.0,
            rotation_rate_deg_per_sec: 45.0,
            rotation_secs: 10.0,
            walk_speed_mps: 0.8,
            scan_amplitude_deg: 45.0,
            scan_period_secs: 4.0,
            duration_secs: 30.0,
            advert_interval_secs: 0.1,
            heading_interval_secs: 0.125,
            frame_interval_secs: 1.0 / 30.0,
            foreign_advert_ratio: 0.2,
            calibration_secs: None,
            seed: 0,
            description: None,
            scenario: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioEvent {
    Heading { t: f64, heading: f64 },
    Advertisement { t: f64, name: String, rssi: f64 },
    Frame { t: f64, elapsed: f64 },
}

impl ScenarioEvent {
    pub fn time(&self) -> f64 {
        match self {
            ScenarioEvent::Heading { t, .. }
            | ScenarioEvent::Advertisement { t, .. }
            | ScenarioEvent::Frame { t, .. } => *t,
        }
    }
}

/// Observer pose at time `t`: heading and true distance to the tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub heading: f64,
    pub distance_m: f64,
}

impl ScenarioConfig {
    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.duration_secs > 0.0 && self.duration_secs <= MAX_SCENARIO_SECS,
            "scenario duration must lie in (0, {}] s, got {}",
            MAX_SCENARIO_SECS,
            self.duration_secs
        );
        ensure!(
            self.advert_interval_secs >= MIN_EVENT_INTERVAL_SECS
                && self.heading_interval_secs >= MIN_EVENT_INTERVAL_SECS
                && self.frame_interval_secs >= MIN_EVENT_INTERVAL_SECS,
            "event intervals must be at least {} s",
            MIN_EVENT_INTERVAL_SECS
        );
        ensure!(self.path_loss_exponent > 0.0, "path loss exponent must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.outlier_probability)
                && (0.0..=1.0).contains(&self.foreign_advert_ratio),
            "probabilities must lie in [0, 1]"
        );
        Ok(())
    }

    pub fn calibration_hold(&self) -> f64 {
        self.calibration_secs.unwrap_or(0.0).max(0.0)
    }

    pub fn walk_start(&self) -> f64 {
        self.calibration_hold() + self.rotation_secs.max(0.0)
    }

    pub fn pose_at(&self, t: f64) -> Pose {
        let hold = self.calibration_hold();
        if t < hold {
            return Pose {
                heading: AngleMath::normalize(self.tag_bearing_deg),
                distance_m: 1.0,
            };
        }
        let walk_start = self.walk_start();
        if t < walk_start {
            return Pose {
                heading: AngleMath::normalize(self.rotation_rate_deg_per_sec * (t - hold)),
                distance_m: self.start_distance_m,
            };
        }
        let walked = self.walk_speed_mps * (t - walk_start);
        Pose {
            heading: AngleMath::normalize(
                self.tag_bearing_deg
                    + scan_wobble(t - walk_start, self.scan_amplitude_deg, self.scan_period_secs),
            ),
            distance_m: (self.start_distance_m - walked).max(self.min_distance_m),
        }
    }

    fn mean_rssi(&self, pose: &Pose) -> f64 {
        let relative = AngleMath::shortest_signed_diff(pose.heading, self.tag_bearing_deg);
        path_loss_rssi(self.tx_power_at_1m, self.path_loss_exponent, pose.distance_m)
            - body_shadow_db(relative, self.body_shadow_db)
    }
}

fn jitter(rng: &mut StdRng, amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rng.gen_range(-amplitude..amplitude)
    } else {
        0.0
    }
}

fn sample_times(duration: f64, interval: f64) -> impl Iterator<Item = f64> {
    let count = (duration / interval).floor() as usize;
    (0..=count).map(move |i| i as f64 * interval)
}

/// Builds the time-ordered event stream a host would see during the scenario.
pub fn build_event_stream(config: &ScenarioConfig) -> anyhow::Result<Vec<ScenarioEvent>> {
    config.validate().context("validating scenario config")?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut events = Vec::new();

    for t in sample_times(config.duration_secs, config.heading_interval_secs) {
        events.push(ScenarioEvent::Heading {
            t,
            heading: config.pose_at(t).heading,
        });
    }

    for t in sample_times(config.duration_secs, config.advert_interval_secs) {
        let pose = config.pose_at(t);
        let mut rssi = config.mean_rssi(&pose) + jitter(&mut rng, config.noise_db);
        if rng.gen_bool(config.outlier_probability) {
            rssi -= config.outlier_drop_db;
        }
        events.push(ScenarioEvent::Advertisement {
            t,
            name: config.tag_code.clone(),
            rssi: rssi.round(),
        });

        if rng.gen_bool(config.foreign_advert_ratio) {
            events.push(ScenarioEvent::Advertisement {
                t,
                name: format!("OTHER-{:02}", rng.gen_range(2..99)),
                rssi: rng.gen_range(-95.0..-45.0_f64).round(),
            });
        }
    }

    for (i, t) in sample_times(config.duration_secs, config.frame_interval_secs).enumerate() {
        if i > 0 {
            events.push(ScenarioEvent::Frame {
                t,
                elapsed: config.frame_interval_secs,
            });
        }
    }

    events.sort_by(|a, b| a.time().total_cmp(&b.time()));
    Ok(events)
}
