// src/lib.rs

pub mod cli;
pub mod collect;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod job;
pub mod logging;
pub mod progress;
pub mod store;
pub mod types;

use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, RenderArgs};
use crate::config::ConfigFile;
use crate::config::loader::load_or_default;
use crate::engine::Scheduler;
use crate::job::{JobSnapshot, JobState, Phase};

/// How often the CLI polls the job status.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - scheduler, workers and the process supervisor
/// - status polling and Ctrl-C cancellation
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)?;

    match args.command {
        Command::Check => {
            print_check(&cfg);
            Ok(())
        }
        Command::Render(render) => render_one(&cfg, &render).await,
    }
}

/// Submit one job, print each status change, and report the outcome.
async fn render_one(cfg: &ConfigFile, args: &RenderArgs) -> Result<()> {
    let scheduler = Scheduler::from_config(cfg);
    let job_id = scheduler.submit(args.to_request())?;
    info!(job_id = %job_id, scene = ?args.scene, "submitted render job");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupt_armed = true;

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut last_seen: Option<(Phase, u8, String)> = None;

    let finished = loop {
        tokio::select! {
            res = &mut ctrl_c, if interrupt_armed => {
                interrupt_armed = false;
                match res {
                    Ok(()) => {
                        info!(job_id = %job_id, "interrupted; cancelling render");
                        scheduler.cancel(&job_id)?;
                    }
                    Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
                }
            }

            _ = ticker.tick() => {
                let snapshot = scheduler.status(&job_id)?;
                let key = (
                    snapshot.phase(),
                    snapshot.progress.percent,
                    snapshot.progress.message.clone(),
                );
                if last_seen.as_ref() != Some(&key) {
                    print_status(&snapshot, args.json)?;
                    last_seen = Some(key);
                }
                if snapshot.phase().is_terminal() {
                    break snapshot;
                }
            }
        }
    };

    scheduler.shutdown().await?;

    match &finished.state {
        JobState::Succeeded { .. } => {
            for path in scheduler.artifacts(&job_id)? {
                if args.json {
                    println!("{}", serde_json::json!({ "artifact": path }));
                } else {
                    println!("{}", path.display());
                }
            }
            Ok(())
        }
        JobState::Failed { error } => {
            if !args.json && !error.diagnostic.is_empty() {
                eprintln!("{}", error.diagnostic);
            }
            Err(anyhow!("job {job_id} failed: {}", error.kind))
        }
        JobState::Queued | JobState::Running => Err(anyhow!(
            "job {job_id} stopped in non-terminal phase {}",
            finished.phase()
        )),
    }
}

fn print_status(snapshot: &JobSnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
        return Ok(());
    }

    let mut line = format!(
        "[{:>3}%] {:<9} {}",
        snapshot.progress.percent,
        snapshot.phase(),
        snapshot.progress.message
    );
    if let Some(eta) = &snapshot.progress.eta {
        if !snapshot.progress.message.contains(eta.as_str()) {
            line.push_str(&format!(" (ETA {eta})"));
        }
    }
    println!("{line}");
    Ok(())
}

/// Print the effective configuration without rendering anything.
fn print_check(cfg: &ConfigFile) {
    println!("renderq config check");
    println!("  renderer.executable = {}", cfg.renderer.executable.display());
    println!(
        "  renderer.driver_script = {}",
        cfg.renderer.driver_script.display()
    );
    println!("  renderer.use_gpu = {}", cfg.renderer.use_gpu);
    println!("  renderer.gpu_backend = {}", cfg.renderer.gpu_backend.token());
    println!();

    println!("defaults:");
    println!("  format = {}", cfg.defaults.format);
    println!("  samples = {}", cfg.defaults.samples);
    println!(
        "  resolution = {}x{}",
        cfg.defaults.resolution_x, cfg.defaults.resolution_y
    );
    println!();

    println!("scheduler:");
    println!("  render_slots = {}", cfg.render_slots);
    println!("  queue_horizon = {:?}", cfg.queue_horizon);
    println!("  log_tail_lines = {}", cfg.log_tail_lines);
    println!("  kill_grace = {:?}", cfg.kill_grace);
    println!("  output_root = {}", cfg.output_root.display());

    debug!("config check complete (no render started)");
}
