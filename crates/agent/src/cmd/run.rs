//! Run command - start channels, sinks and the stdin line source

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use spool_channel::Channel;
use spool_sinks::{FormatterRegistry, LocalFileSystem, WriterSink};
use spool_sources::LineSource;
use tokio::signal;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::agent::Agent;

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Seconds to wait for channels to drain and sinks to stop on shutdown
    #[arg(long, default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 10,
        }
    }
}

type SinkTask = (String, JoinHandle<spool_sinks::Result<()>>);

/// Run the agent until stdin closes or a shutdown signal arrives
pub async fn run(config_path: Option<PathBuf>, args: RunArgs) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?config_path,
        "spool starting"
    );

    let config = super::load_config(config_path.as_deref())?;
    let mut agent = Agent::build(
        &config,
        &FormatterRegistry::new(),
        Arc::new(LocalFileSystem::new()),
    )?;
    let shutdown_timeout = Duration::from_secs(args.shutdown_timeout_secs);

    let running = Arc::new(AtomicBool::new(true));
    let sink_tasks = spawn_sinks(std::mem::take(&mut agent.sinks), &running);

    let mut line_source = match agent.line_source.take() {
        Some(source) => Some(spawn_stdin_source(source)?),
        None => None,
    };
    for rpc in &agent.rpc_sources {
        info!(source = %rpc.name(), "rpc source ready (no transport attached)");
    }

    info!(
        channels = agent.channels.len(),
        sinks = sink_tasks.len(),
        stdin = line_source.is_some(),
        "spool running"
    );

    let stdin_closed = async {
        match line_source.as_mut() {
            Some((_, done)) => done.await.ok(),
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = wait_for_shutdown() => {
            info!("shutdown signal received, stopping agent...");
        }
        result = stdin_closed => match result {
            Some(Ok(lines)) => info!(lines, "stdin closed, stopping agent..."),
            Some(Err(e)) => error!(error = %e, "line source failed, stopping agent..."),
            None => warn!("line source thread exited without reporting"),
        },
    }

    // Stop intake first, then let sinks catch up
    if let Some((flag, _)) = &line_source {
        flag.store(false, Ordering::Relaxed);
    }
    for rpc in &agent.rpc_sources {
        rpc.stop();
    }

    info!("waiting for channels to drain...");
    wait_for_drain(&agent.channels, shutdown_timeout).await;

    info!("stopping sinks...");
    let stopped = stop_sinks(&running, &agent.channels, sink_tasks, shutdown_timeout).await;
    info!(stopped, "sinks stopped");

    let (registry, processors) = agent.metrics();
    info!(metrics = %registry.to_json(), "final counters");
    for (source, snapshot) in processors {
        info!(source = %source, metrics = ?snapshot, "final processor metrics");
    }

    info!("spool shutdown complete");
    Ok(())
}

/// Run each sink on the blocking pool until `running` clears
fn spawn_sinks(sinks: Vec<WriterSink>, running: &Arc<AtomicBool>) -> Vec<SinkTask> {
    sinks
        .into_iter()
        .map(|mut sink| {
            let running = Arc::clone(running);
            let name = sink.name().to_string();
            let task = tokio::task::spawn_blocking(move || sink.run(&running));
            (name, task)
        })
        .collect()
}

/// Read stdin on a dedicated thread
///
/// A plain thread rather than the blocking pool: a read blocked on stdin
/// cannot be interrupted and must not hold up runtime shutdown.
fn spawn_stdin_source(
    source: LineSource,
) -> Result<(Arc<AtomicBool>, oneshot::Receiver<spool_sources::Result<u64>>)> {
    let (tx, rx) = oneshot::channel();
    let flag = source.running_flag();
    std::thread::Builder::new()
        .name(format!("source-{}", source.name()))
        .spawn(move || {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            let result = source.run(stdin.lock(), stdout.lock());
            // Receiver is gone once shutdown started
            let _ = tx.send(result);
        })
        .context("failed to spawn line source thread")?;
    Ok((flag, rx))
}

/// Wait until every channel is empty or `timeout` passes
///
/// Returns whether all channels drained.
pub(crate) async fn wait_for_drain(channels: &BTreeMap<String, Channel>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if channels.values().all(Channel::is_empty) {
            return true;
        }
        if Instant::now() >= deadline {
            for (name, channel) in channels {
                if !channel.is_empty() {
                    warn!(channel = %name, remaining = channel.len(), "channel not drained before shutdown");
                }
            }
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Clear the run flag, wake blocked takers and join the sink tasks
///
/// Returns how many sinks stopped cleanly.
pub(crate) async fn stop_sinks(
    running: &AtomicBool,
    channels: &BTreeMap<String, Channel>,
    tasks: Vec<SinkTask>,
    timeout: Duration,
) -> usize {
    running.store(false, Ordering::Relaxed);
    for channel in channels.values() {
        channel.interrupt_takers();
    }

    let mut clean = 0;
    for (name, task) in tasks {
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(Ok(()))) => clean += 1,
            Ok(Ok(Err(e))) => warn!(sink = %name, error = %e, "sink stopped with error"),
            Ok(Err(e)) => warn!(sink = %name, error = %e, "sink task panicked"),
            Err(_) => warn!(sink = %name, "sink did not stop within timeout"),
        }
    }
    clean
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
#[path = "run_test.rs"]
mod run_test;
