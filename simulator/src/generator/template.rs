//! Signal templates shared by the synthetic scenarios.

use std::f64::consts::PI;

/// Mean RSSI of the log-distance model at `distance_m`.
pub fn path_loss_rssi(tx_power_at_1m: f64, path_loss_exponent: f64, distance_m: f64) -> f64 {
    tx_power_at_1m - 10.0 * path_loss_exponent * distance_m.max(0.01).log10()
}

/// Attenuation caused by the observer's body when facing away from the tag.
///
/// Zero when facing the tag, `depth_db` when facing directly away.
pub fn body_shadow_db(relative_deg: f64, depth_db: f64) -> f64 {
    depth_db * (1.0 - relative_deg.to_radians().cos()) / 2.0
}

/// Side-to-side scanning motion while walking, in degrees.
pub fn scan_wobble(t: f64, amplitude_deg: f64, period_secs: f64) -> f64 {
    if period_secs <= 0.0 {
        return 0.0;
    }
    amplitude_deg * (2.0 * PI * t / period_secs).sin()
}
