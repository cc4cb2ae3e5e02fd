//! Persists the two calibration scalars between runs.

use anyhow::Context;
use log::{info, warn};
use std::fs;
use std::path::Path;
use tagradarcore::interface::CalibrationParams;

/// Loads stored calibration, falling back to the defaults when none exists.
pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<CalibrationParams> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        info!("no calibration at {}, using defaults", path_ref.display());
        return Ok(CalibrationParams::default());
    }
    let contents = fs::read_to_string(path_ref)
        .with_context(|| format!("reading calibration {}", path_ref.display()))?;
    let params: CalibrationParams = match serde_json::from_str(&contents) {
        Ok(params) => params,
        Err(err) => {
            warn!("ignoring unreadable calibration {}: {}", path_ref.display(), err);
            return Ok(CalibrationParams::default());
        }
    };
    if let Err(err) = params.validate() {
        warn!("ignoring stored calibration: {}", err);
        return Ok(CalibrationParams::default());
    }
    Ok(params)
}

pub fn save<P: AsRef<Path>>(path: P, params: &CalibrationParams) -> anyhow::Result<()> {
    let path_ref = path.as_ref();
    if let Some(parent) = path_ref.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let contents = serde_json::to_string_pretty(params).context("serializing calibration")?;
    fs::write(path_ref, contents)
        .with_context(|| format!("writing calibration {}", path_ref.display()))?;
    Ok(())
}
