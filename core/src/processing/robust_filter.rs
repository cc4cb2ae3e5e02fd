use crate::config::FilterConfig;
use crate::math::stats::StatsHelper;
use crate::prelude::EstimationStage;
use crate::processing::window::BoundedWindow;

/// Median/MAD outlier clipping followed by exponential smoothing.
///
/// One instance per scalar stream. The optional deadband holds the published
/// value when the smoothed value moves by less than `config.deadband`.
pub struct RobustFilter {
    name: &'static str,
    config: FilterConfig,
    window: BoundedWindow<f64>,
    ema: Option<f64>,
    published: Option<f64>,
}

impl RobustFilter {
    pub fn new(name: &'static str, config: FilterConfig) -> Self {
        Self {
            name,
            window: BoundedWindow::with_capacity(config.window),
            config,
            ema: None,
            published: None,
        }
    }

    /// Adds `raw` to the window and clamps it to `median ± clip_mads * MAD`.
    pub fn push_and_clip(&mut self, raw: f64) -> f64 {
        self.window.push(raw);
        let values = self.window.to_vec();
        match StatsHelper::median_and_mad(&values, self.config.mad_floor) {
            Some((median, mad)) => {
                let band = self.config.clip_mads * mad;
                raw.clamp(median - band, median + band)
            }
            None => raw,
        }
    }

    pub fn ema(&mut self, clipped: f64) -> f64 {
        let alpha = self.config.alpha;
        let smoothed = match self.ema {
            Some(previous) => alpha * clipped + (1.0 - alpha) * previous,
            None => clipped,
        };
        self.ema = Some(smoothed);
        smoothed
    }

    /// Suppresses sub-resolution changes relative to the last published value.
    pub fn apply_deadband(&mut self, smoothed: f64) -> f64 {
        let published = match self.published {
            Some(previous) if (smoothed - previous).abs() < self.config.deadband => previous,
            _ => smoothed,
        };
        self.published = Some(published);
        published
    }

    /// Runs all stages and returns the value to publish.
    pub fn update(&mut self, raw: f64) -> f64 {
        let clipped = self.push_and_clip(raw);
        let smoothed = self.ema(clipped);
        self.apply_deadband(smoothed)
    }

    pub fn value(&self) -> Option<f64> {
        self.published
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Forgets the clipping window while keeping the smoothed value.
    pub fn clear_window(&mut self) {
        self.window.reset();
    }
}

impl EstimationStage for RobustFilter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn reset(&mut self) {
        self.window.reset();
        self.ema = None;
        self.published = None;
    }
}
