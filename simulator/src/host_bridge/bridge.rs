use crate::generator::scenario::ScenarioConfig;
use crate::host_bridge::model::{BridgeModel, HostEvent, RunSummary};
use crate::workflow::runner::{Runner, WorkflowResult};
use anyhow::Context;
use log::{error, info, warn};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tagradarcore::interface::TagMatcher;
use tagradarcore::queue::{TrackerEvent, TrackerHandle, TrackerOutput};
use tokio::sync::broadcast::error::RecvError;
use warp::{http::StatusCode, Filter};

pub fn bridge_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

#[derive(Debug)]
struct BridgeError;

impl warp::reject::Reject for BridgeError {}

type SharedModel = Arc<RwLock<BridgeModel>>;

fn read_model(state: &SharedModel) -> RwLockReadGuard<'_, BridgeModel> {
    state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_model(state: &SharedModel) -> RwLockWriteGuard<'_, BridgeModel> {
    state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn fold_output(model: &mut BridgeModel, output: TrackerOutput) {
    match output {
        TrackerOutput::Sample(update) => model.last_guidance = Some(update.guidance),
        TrackerOutput::Guidance(update) => model.last_guidance = Some(update),
        TrackerOutput::Hit(hit) => {
            model.hits += 1;
            model.last_hit = Some(hit);
        }
        TrackerOutput::Calibration(result) => model.last_calibration = Some(result),
        TrackerOutput::Rejected(_) => model.rejected += 1,
    }
}

/// HTTP front for a live tracker: hosts post events, poll the snapshot and
/// can replay synthetic scenarios on demand.
#[derive(Clone)]
pub struct HostBridge {
    state: SharedModel,
    handle: TrackerHandle,
    runner: Arc<Runner>,
    matcher: TagMatcher,
}

impl HostBridge {
    /// Must be called inside a tokio runtime; it spawns the task that folds
    /// tracker outputs into the served model.
    pub fn new(runner: Arc<Runner>, handle: TrackerHandle) -> Self {
        let state: SharedModel = Arc::new(RwLock::new(BridgeModel::default()));
        let matcher = TagMatcher::new(&runner.config().scenario.tag_code);

        let mut outputs = handle.subscribe();
        let state_for_outputs = state.clone();
        tokio::spawn(async move {
            loop {
                match outputs.recv().await {
                    Ok(output) => {
                        let mut model = write_model(&state_for_outputs);
                        fold_output(&mut model, output);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("bridge fell behind, {} outputs skipped", skipped)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self {
            state,
            handle,
            runner,
            matcher,
        }
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone + Send + Sync + 'static
    {
        let bridge = self.clone();
        let bridge_filter = warp::any().map(move || bridge.clone());

        let snapshot_route = warp::path("snapshot")
            .and(warp::get())
            .and(bridge_filter.clone())
            .map(|bridge: HostBridge| warp::reply::json(&bridge.handle.snapshot()));

        let model_route = warp::path("model")
            .and(warp::get())
            .and(bridge_filter.clone())
            .map(|bridge: HostBridge| warp::reply::json(&bridge.model()));

        let events_route = warp::path("events")
            .and(warp::post())
            .and(warp::body::json())
            .and(bridge_filter.clone())
            .and_then(|event: HostEvent, bridge: HostBridge| async move {
                let Some(event) = event.into_tracker_event(&bridge.matcher) else {
                    write_model(&bridge.state).filtered += 1;
                    return Ok::<_, warp::Rejection>(warp::reply::json(
                        &json!({"status": "filtered"}),
                    ));
                };
                match bridge.handle.send(event).await {
                    Ok(()) => {
                        if matches!(event, TrackerEvent::Beacon { .. }) {
                            write_model(&bridge.state).forwarded += 1;
                        }
                        Ok(warp::reply::json(&json!({"status": "queued"})))
                    }
                    Err(err) => {
                        error!("events error: {}", err);
                        Err(warp::reject::custom(BridgeError))
                    }
                }
            });

        let run_route = warp::path("run")
            .and(warp::post())
            .and(warp::body::json())
            .and(bridge_filter)
            .and_then(|scenario: ScenarioConfig, bridge: HostBridge| async move {
                let runner = Arc::clone(&bridge.runner);
                let replay = scenario.clone();
                let outcome = tokio::task::spawn_blocking(move || runner.run_scenario(&replay))
                    .await
                    .map_err(anyhow::Error::from)
                    .and_then(|result| result);
                match outcome {
                    Ok(result) => {
                        let summary = bridge.publish_run(scenario.scenario.clone(), &result);
                        Ok::<_, warp::Rejection>(warp::reply::with_status(
                            warp::reply::json(&summary),
                            StatusCode::OK,
                        ))
                    }
                    Err(err) => {
                        error!("run error: {:#}", err);
                        Err(warp::reject::custom(BridgeError))
                    }
                }
            });

        snapshot_route.or(model_route).or(events_route).or(run_route)
    }

    /// Binds the routes and returns the bound address with the server future.
    /// Once `shutdown` resolves the server stops accepting, closes idle
    /// keep-alive connections and completes after in-flight requests finish.
    pub fn bind_until<F>(
        self,
        address: SocketAddr,
        shutdown: F,
    ) -> anyhow::Result<(SocketAddr, impl Future<Output = ()> + Send + 'static)>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(address, shutdown)
            .with_context(|| format!("binding host bridge to {}", address))?;
        info!("host bridge listening on {}", bound);
        Ok((bound, server))
    }

    pub fn publish_run(&self, scenario: Option<String>, result: &WorkflowResult) -> RunSummary {
        let summary = RunSummary::from_result(scenario, result);
        if let Some(name) = summary.scenario.as_ref() {
            info!(
                "scenario {} -> {} after {} changes",
                name,
                summary.instruction.phrase(),
                summary.instruction_changes
            );
        }
        write_model(&self.state).last_run = Some(summary.clone());
        summary
    }

    pub fn model(&self) -> BridgeModel {
        read_model(&self.state).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::config::WorkflowConfig;
    use tagradarcore::queue::spawn_update_loop;
    use tagradarcore::{Tracker, TrackingSnapshot};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    fn bridge() -> HostBridge {
        let runner = Arc::new(Runner::new(WorkflowConfig::default()));
        let (handle, _task) = spawn_update_loop(Tracker::default(), 32);
        HostBridge::new(runner, handle)
    }

    async fn post_event(bridge: &HostBridge, body: serde_json::Value) -> serde_json::Value {
        let response = warp::test::request()
            .method("POST")
            .path("/events")
            .json(&body)
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn snapshot_starts_idle() {
        let bridge = bridge();
        let response = warp::test::request()
            .method("GET")
            .path("/snapshot")
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let snapshot: TrackingSnapshot = serde_json::from_slice(response.body()).unwrap();
        assert!(!snapshot.session_active);
        assert!(snapshot.distance.is_none());
    }

    #[tokio::test]
    async fn posted_events_reach_the_tracker() {
        let bridge = bridge();
        let mut watch = bridge.handle.watch();

        post_event(&bridge, json!({"type": "start_session"})).await;
        post_event(&bridge, json!({"type": "heading", "heading": 30.0, "timestamp": 0.0})).await;
        let reply = post_event(
            &bridge,
            json!({"type": "advertisement", "name": "tag01-keys", "rssi": -70.0, "timestamp": 0.1}),
        )
        .await;
        assert_eq!(reply["status"], "queued");

        while bridge.handle.snapshot().distance.is_none() {
            watch.changed().await.unwrap();
        }
        let snapshot = bridge.handle.snapshot();
        assert!(snapshot.session_active);
        assert_eq!(snapshot.heading_deg, Some(30.0));
        assert_eq!(bridge.model().forwarded, 1);
    }

    #[tokio::test]
    async fn foreign_advertisements_are_filtered() {
        let bridge = bridge();
        let reply = post_event(
            &bridge,
            json!({"type": "advertisement", "name": "OTHER-01", "rssi": -50.0, "timestamp": 0.0}),
        )
        .await;
        assert_eq!(reply["status"], "filtered");
        let model = bridge.model();
        assert_eq!(model.filtered, 1);
        assert_eq!(model.forwarded, 0);
    }

    #[tokio::test]
    async fn run_route_replays_a_scenario() {
        let bridge = bridge();
        let scenario = ScenarioConfig {
            duration_secs: 12.0,
            scenario: Some("short".into()),
            ..Default::default()
        };
        let response = warp::test::request()
            .method("POST")
            .path("/run")
            .json(&scenario)
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let summary: RunSummary = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(summary.scenario.as_deref(), Some("short"));
        assert!(summary.distance_m.is_some());
        assert_eq!(bridge.model().last_run, Some(summary));
    }

    #[tokio::test]
    async fn run_route_refuses_oversized_scenarios() {
        let bridge = bridge();
        let scenario = ScenarioConfig {
            duration_secs: 1.0e7,
            ..Default::default()
        };
        let response = warp::test::request()
            .method("POST")
            .path("/run")
            .json(&scenario)
            .reply(&bridge.routes())
            .await;
        assert_ne!(response.status(), StatusCode::OK);
        assert_eq!(bridge.model().last_run, None);
    }

    #[tokio::test]
    async fn shutdown_completes_with_idle_keep_alive_client() {
        let bridge = bridge();
        let handle = bridge.handle.clone();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let (address, server) = bridge
            .bind_until(SocketAddr::from(([127, 0, 0, 1], 0)), async move {
                let _ = stop_rx.await;
            })
            .unwrap();
        let server = tokio::spawn(server);

        let mut stream = TcpStream::connect(address).await.unwrap();
        stream
            .write_all(b"GET /snapshot HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut status = [0u8; 12];
        stream.read_exact(&mut status).await.unwrap();
        assert_eq!(&status, b"HTTP/1.1 200");

        stop_tx.send(()).unwrap();
        server.await.unwrap();
        // the connection's handle copy is gone, but the barrier never needed it
        let snapshot = handle.flush().await.unwrap();
        assert!(!snapshot.session_active);
        drop(stream);
    }
}
