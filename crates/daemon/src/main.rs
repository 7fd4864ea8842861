// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Course Update Daemon (cud)
//!
//! Runs a scheduling pass on a timer and on SIGUSR1, dispatching due courses
//! to the tiered update queues.

use std::path::PathBuf;

use clap::Parser;
use cu_daemon::lifecycle::{self, run_logged};
use cu_daemon::{LifecycleError, SchedulerConfig};
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinSet;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "cud", version, about = "Course update scheduler daemon")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Run a single pass, print its summary and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SchedulerConfig::load(path),
        None => Ok(SchedulerConfig::default()),
    };
    // Logging is not set up yet, so config errors go straight to stderr
    let config = config.inspect_err(|e| eprintln!("cud: {e}"))?;

    // Write startup marker to log (before tracing setup)
    write_startup_marker(&config)?;

    let log_guard = setup_logging(&config)?;

    let daemon = match lifecycle::startup(&config) {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            eprintln!("cud: {e}");
            drop(log_guard);
            return Err(e.into());
        }
    };

    if args.once {
        let result = daemon.run_pass().await;
        drop(log_guard);
        return match result {
            Ok(report) => {
                println!("{}", report.summary_line());
                Ok(())
            }
            Err(e) => {
                // The partial report still carries whatever the pass gathered
                if let LifecycleError::Pass(pass_error) = &e {
                    println!("{}", pass_error.report().summary_line());
                }
                eprintln!("cud: {e}");
                Err(e.into())
            }
        };
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigusr1 = signal(SignalKind::user_defined1())?;

    let mut timer = tokio::time::interval(config.schedule.interval);
    let mut passes = JoinSet::new();

    info!("Daemon ready, pass interval {:?}", config.schedule.interval);

    loop {
        tokio::select! {
            _ = timer.tick() => {
                let pass = daemon.pass.clone();
                passes.spawn(async move { run_logged(&pass).await.map(|_| ()) });
            }

            // Manual trigger
            _ = sigusr1.recv() => {
                info!("Received SIGUSR1, starting pass");
                let pass = daemon.pass.clone();
                passes.spawn(async move { run_logged(&pass).await.map(|_| ()) });
            }

            // Reap finished passes; failures are already logged
            Some(_) = passes.join_next() => {}

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
        }
    }

    // Let in-flight passes finish so no lock is left without its job
    while let Some(joined) = passes.join_next().await {
        if let Err(e) = joined {
            error!("pass task failed: {}", e);
        }
    }

    info!("Daemon stopped");
    Ok(())
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- cud: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- cud: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &SchedulerConfig) -> Result<(), LifecycleError> {
    use std::io::Write;

    let log_path = config.paths.log_path();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &SchedulerConfig, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.paths.log_path())
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &SchedulerConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_path = config.paths.log_path();
    let dir = log_path.parent().ok_or(LifecycleError::BadLogPath)?;
    let file_name = log_path.file_name().ok_or(LifecycleError::BadLogPath)?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(guard)
}
