use anyhow::Context;
use clap::Parser;
use host_bridge::bridge::{bridge_bind_address, HostBridge};
use log::info;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tagradarcore::interface::CalibrationParams;
use tagradarcore::queue::spawn_update_loop;
use tagradarcore::Tracker;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use tokio::sync::oneshot;
use workflow::config::WorkflowConfig;
use workflow::runner::{Runner, WorkflowResult};

mod calibration_store;
mod generator;
mod host_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Synthetic host for the tag radar estimation core")]
struct Args {
    /// Replay one synthetic scenario and append a guidance report
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value = "TAG01")]
    tag: String,
    /// True bearing of the tag in degrees
    #[arg(long, default_value_t = 135.0)]
    bearing: f64,
    /// Starting distance to the tag in meters
    #[arg(long, default_value_t = 12.0)]
    distance: f64,
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Hold the scanner at one meter first and recalibrate
    #[arg(long, default_value_t = false)]
    calibrate: bool,
    #[arg(long, default_value = "tools/data/calibration.json")]
    calibration_store: PathBuf,
    /// Keep the HTTP bridge alive for a live host
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn write_report(result: &WorkflowResult) -> anyhow::Result<()> {
    let snapshot = &result.final_snapshot;
    let report = format!(
        "instruction={:?} distance={:?} true_distance={:.2} bearing={:?} true_bearing={:.1} confidence={:.2} changes={} announcements={} hits={} forwarded={} filtered={} rejected={}\n",
        snapshot.guidance.instruction,
        snapshot.distance.map(|d| d.meters),
        result.true_distance_m,
        snapshot.bearing.angle_deg,
        result.true_bearing_deg,
        snapshot.bearing.confidence,
        result.instruction_changes.len(),
        result.announcements,
        result.hits,
        result.forwarded,
        result.filtered,
        result.rejected
    );
    let report_path = PathBuf::from("tools/data/offline_guidance.log");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent).context("creating report directory")?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&report_path)
        .with_context(|| format!("opening {}", report_path.display()))?;
    file.write_all(report.as_bytes())
        .context("appending guidance report")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow.as_ref() {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(&args.tag, args.bearing, args.distance, args.seed, args.calibrate)
    };

    let mut calibration = calibration_store::load(&args.calibration_store)?;
    let runner = Runner::with_calibration(workflow_config.clone(), calibration);

    let mut offline_result = None;
    if args.offline {
        let result = runner.run()?;
        let snapshot = &result.final_snapshot;
        println!(
            "Offline run -> {} ({}), distance {:?}, bearing {:?} @ {:.2}, {} changes, {} hits",
            snapshot.guidance.instruction.phrase(),
            snapshot
                .guidance
                .arrow
                .map(|arrow| arrow.glyph())
                .unwrap_or(' '),
            snapshot.distance.map(|d| d.meters),
            snapshot.bearing.angle_deg,
            snapshot.bearing.confidence,
            result.instruction_changes.len(),
            result.hits
        );

        if let Some(outcome) = result.calibration {
            match outcome.new_tx_power.filter(|_| outcome.accepted) {
                Some(tx_power) => {
                    calibration = CalibrationParams::new(tx_power, calibration.path_loss_exponent)?;
                    calibration_store::save(&args.calibration_store, &calibration)?;
                    println!("Calibration accepted: tx power {:.0} dBm", tx_power);
                }
                None => println!(
                    "Calibration rejected after {} samples",
                    outcome.sample_count
                ),
            }
        }

        write_report(&result)?;
        offline_result = Some(result);
    }

    if args.serve {
        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating runtime for the host bridge")?;
        let final_calibration = runtime.block_on(async {
            let tracker = Tracker::new(workflow_config.tracker.clone(), calibration);
            let (handle, _loop_task) = spawn_update_loop(tracker, 64);
            let runner = Arc::new(Runner::with_calibration(workflow_config.clone(), calibration));
            let bridge = HostBridge::new(runner, handle.clone());
            if let Some(result) = offline_result.as_ref() {
                bridge.publish_run(workflow_config.scenario.scenario.clone(), result);
            }

            let (stop_tx, stop_rx) = oneshot::channel::<()>();
            let (address, server) = bridge.bind_until(bridge_bind_address(), async move {
                let _ = stop_rx.await;
            })?;
            println!("HTTP bridge running on {} (Ctrl+C to stop)...", address);
            let server = tokio::spawn(server);
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;

            let _ = stop_tx.send(());
            server.await.context("closing host bridge")?;
            let snapshot = handle.flush().await.context("flushing tracker updates")?;
            Ok::<_, anyhow::Error>(snapshot.calibration)
        })?;

        if final_calibration != calibration {
            calibration_store::save(&args.calibration_store, &final_calibration)?;
            info!("stored live calibration {:?}", final_calibration);
        }
    }

    Ok(())
}
