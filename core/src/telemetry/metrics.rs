use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Counters shared between the update loop and whoever reports on it.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub samples_accepted: usize,
    pub samples_rejected: usize,
    pub hits: usize,
    pub instruction_commits: usize,
    pub announcements: usize,
    pub calibrations_accepted: usize,
    pub calibrations_rejected: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn bump<F: FnOnce(&mut MetricsSnapshot)>(&self, update: F) {
        if let Ok(mut metrics) = self.inner.lock() {
            update(&mut metrics);
        }
    }

    pub fn record_sample(&self) {
        self.bump(|m| m.samples_accepted += 1);
    }

    pub fn record_rejected(&self) {
        self.bump(|m| m.samples_rejected += 1);
    }

    pub fn record_hit(&self) {
        self.bump(|m| m.hits += 1);
    }

    pub fn record_commit(&self, announced: bool) {
        self.bump(|m| {
            m.instruction_commits += 1;
            if announced {
                m.announcements += 1;
            }
        });
    }

    pub fn record_announcement(&self) {
        self.bump(|m| m.announcements += 1);
    }

    pub fn record_calibration(&self, accepted: bool) {
        self.bump(|m| {
            if accepted {
                m.calibrations_accepted += 1;
            } else {
                m.calibrations_rejected += 1;
            }
        });
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
