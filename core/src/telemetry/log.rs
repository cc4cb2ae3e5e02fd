use log::{debug, info, warn};

/// Thin logging handle carried by stages so every record names its source.
#[derive(Debug, Clone, Copy)]
pub struct LogManager {
    source: &'static str,
}

impl LogManager {
    pub fn new(source: &'static str) -> Self {
        Self { source }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.source, message);
    }

    pub fn trace(&self, message: &str) {
        debug!("[{}] {}", self.source, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.source, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("tagradar")
    }
}
