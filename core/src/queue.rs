//! Serialized update loop for hosts that deliver events from several threads.
//!
//! Every event goes through one mpsc queue into a task that owns the
//! [`Tracker`], so no two updates ever touch estimator state at once.
//! Outputs fan out on a broadcast channel and the latest snapshot is kept in
//! a watch channel.

use crate::interface::{CalibrationParams, CalibrationResult, GuidanceUpdate, HitEvent};
use crate::prelude::{Timestamp, TrackerError, TrackerResult};
use crate::telemetry::LogManager;
use crate::tracker::{SampleUpdate, Tracker, TrackingSnapshot};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerEvent {
    Beacon { rssi: f64, timestamp: Timestamp },
    Heading { heading: f64, timestamp: Timestamp },
    Tick { elapsed: f64, now: Timestamp },
    StartSession,
    StopSession,
    SetCalibration(CalibrationParams),
    BeginCalibration { now: Timestamp },
    PollCalibration { now: Timestamp },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerOutput {
    Sample(SampleUpdate),
    Guidance(GuidanceUpdate),
    Hit(HitEvent),
    Calibration(CalibrationResult),
    Rejected(TrackerError),
}

enum Command {
    Apply(TrackerEvent),
    /// Answered once every command queued before it has been applied.
    Flush(oneshot::Sender<TrackingSnapshot>),
}

/// Cloneable producer side of the update loop.
#[derive(Clone)]
pub struct TrackerHandle {
    events: mpsc::Sender<Command>,
    outputs: broadcast::Sender<TrackerOutput>,
    snapshots: watch::Receiver<TrackingSnapshot>,
}

impl TrackerHandle {
    pub async fn send(&self, event: TrackerEvent) -> TrackerResult<()> {
        self.events
            .send(Command::Apply(event))
            .await
            .map_err(|_| TrackerError::QueueClosed)
    }

    /// Waits until everything queued so far is applied and returns the
    /// resulting snapshot. Does not depend on other handles being dropped.
    pub async fn flush(&self) -> TrackerResult<TrackingSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.events
            .send(Command::Flush(reply_tx))
            .await
            .map_err(|_| TrackerError::QueueClosed)?;
        reply_rx.await.map_err(|_| TrackerError::QueueClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerOutput> {
        self.outputs.subscribe()
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<TrackingSnapshot> {
        self.snapshots.clone()
    }
}

fn apply(tracker: &mut Tracker, event: TrackerEvent) -> Option<TrackerOutput> {
    let output = match event {
        TrackerEvent::Beacon { rssi, timestamp } => {
            tracker.on_beacon_sample(rssi, timestamp).map(TrackerOutput::Sample)
        }
        TrackerEvent::Heading { heading, timestamp } => tracker
            .on_heading_sample(heading, timestamp)
            .map(TrackerOutput::Guidance),
        TrackerEvent::Tick { elapsed, now } => {
            return match tracker.on_clock_tick(elapsed, now) {
                Ok(hit) => hit.map(TrackerOutput::Hit),
                Err(err) => Some(TrackerOutput::Rejected(err)),
            };
        }
        TrackerEvent::StartSession => {
            tracker.start_session();
            return None;
        }
        TrackerEvent::StopSession => {
            tracker.stop_session();
            return None;
        }
        TrackerEvent::SetCalibration(params) => {
            return tracker
                .set_calibration(params.tx_power_at_1m, params.path_loss_exponent)
                .err()
                .map(TrackerOutput::Rejected);
        }
        TrackerEvent::BeginCalibration { now } => {
            return tracker.begin_calibration(now).err().map(TrackerOutput::Rejected);
        }
        TrackerEvent::PollCalibration { now } => {
            return tracker.poll_calibration(now).map(TrackerOutput::Calibration);
        }
    };
    Some(output.unwrap_or_else(TrackerOutput::Rejected))
}

/// Moves `tracker` into a task and returns the handle feeding it.
///
/// The task ends once every handle is dropped and yields the tracker back.
pub fn spawn_update_loop(mut tracker: Tracker, capacity: usize) -> (TrackerHandle, JoinHandle<Tracker>) {
    let capacity = capacity.max(1);
    let (event_tx, mut event_rx) = mpsc::channel(capacity);
    let (output_tx, _) = broadcast::channel(capacity);
    let (snapshot_tx, snapshot_rx) = watch::channel(tracker.snapshot());
    let logger = LogManager::new("queue");

    let outputs = output_tx.clone();
    let task = tokio::spawn(async move {
        while let Some(command) = event_rx.recv().await {
            let event = match command {
                Command::Apply(event) => event,
                Command::Flush(reply) => {
                    // the caller may have given up waiting
                    let _ = reply.send(tracker.snapshot());
                    continue;
                }
            };
            if let Some(output) = apply(&mut tracker, event) {
                if let TrackerOutput::Rejected(err) = &output {
                    logger.trace(&format!("{:?} rejected: {}", event, err));
                }
                // no subscribers is fine
                let _ = outputs.send(output);
            }
            snapshot_tx.send_replace(tracker.snapshot());
        }
        logger.record("update loop drained");
        tracker
    });

    let handle = TrackerHandle {
        events: event_tx,
        outputs: output_tx,
        snapshots: snapshot_rx,
    };
    (handle, task)
}
