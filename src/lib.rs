// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod hardware;
pub mod logging;
pub mod plan;
pub mod state;
pub mod task;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::engine::{Engine, RunOutcome, Runtime, RuntimeEvent};
use crate::hardware::sim::{SimOptions, sim_rig_wall_clock};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - experiment file loading
/// - the plan compiler
/// - engine + runtime over the simulated rig
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let plan = plan::compile(&cfg);

    if args.dry_run {
        println!("specflow dry-run\n");
        print!("{}", plan.render());
        return Ok(());
    }

    let (rig, handles) = sim_rig_wall_clock(SimOptions::default());
    let engine = Engine::new(plan, rig);

    // Ctrl-C → cancel.
    let (event_tx, event_rx) = mpsc::channel::<RuntimeEvent>(4);
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::CancelRequested).await;
        });
    }

    let runtime = Runtime::new(engine, event_rx, Duration::from_millis(args.tick_ms.max(1)));
    let outcome = runtime.run().await?;

    for line in handles.log.lines() {
        info!(record = %line, "measurement log");
    }

    match outcome {
        RunOutcome::Completed => info!("experiment completed"),
        RunOutcome::Failed => anyhow::bail!("experiment failed; see alerts above"),
        RunOutcome::Cancelled => info!("experiment cancelled"),
    }

    Ok(())
}
