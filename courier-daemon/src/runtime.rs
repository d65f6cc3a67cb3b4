use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use courier_sync::{PublishError, Publisher};

use crate::error::{io_err, DaemonError};
use crate::scheduler::{CycleRunner, Scheduler, QUIESCENCE_WINDOW};
use crate::watcher::watcher_task;

/// Runs [`Publisher::publish`] for one proxy file and logs the outcome.
///
/// Every outcome ends the cycle the same way; failures wait for the next
/// change to be retried.
pub struct PublishCycle {
    publisher: Publisher,
    source: PathBuf,
}

impl PublishCycle {
    pub fn new(publisher: Publisher, source: PathBuf) -> Self {
        Self { publisher, source }
    }
}

impl CycleRunner for PublishCycle {
    fn run_cycle(&self) {
        let started = Instant::now();
        match self.publisher.publish(&self.source) {
            Ok(report) => tracing::info!(
                destination = %report.destination,
                baseline_cleared = report.baseline_cleared,
                duration_ms = started.elapsed().as_millis(),
                "publish cycle completed",
            ),
            Err(PublishError::ConflictDetected { baseline, diff }) => tracing::error!(
                baseline = %baseline.display(),
                "remote copy was edited outside courier; delete the baseline to publish anyway\n{diff}",
            ),
            Err(err) => tracing::error!(error = %err, "publish cycle aborted"),
        }
    }
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(source: &Path) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(source.to_path_buf()))
}

/// Watch `source` and publish it with the system toolchain until ctrl-c.
pub async fn run(source: PathBuf) -> Result<(), DaemonError> {
    let source = fs::canonicalize(&source).map_err(|e| io_err(&source, e))?;

    let publisher = Publisher::system();
    match publisher.layout_for(&source) {
        Ok(layout) => tracing::info!(
            snapshot = %layout.snapshot.display(),
            artifact = %layout.artifact.display(),
            baseline = %layout.baseline.display(),
            "publish layout",
        ),
        Err(err) => tracing::warn!(error = %err, "proxy file has no usable descriptor yet"),
    }

    let runner = Arc::new(PublishCycle::new(publisher, source.clone()));
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Signal(err)),
                    }
                }
            }
        })
    };

    let result = run_with(source, runner, QUIESCENCE_WINDOW, shutdown_tx.clone()).await;
    let _ = shutdown_tx.send(());
    handle_join("signal_handler", signal_handle.await)?;
    result
}

/// Wire the watcher, scheduler and cycle worker around `runner`.
///
/// Returns once `shutdown_tx` fires or any task exits; the first task error
/// wins.
pub async fn run_with<R: CycleRunner>(
    source: PathBuf,
    runner: Arc<R>,
    quiescence: Duration,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let scheduler = Scheduler::spawn(runner, quiescence, &shutdown_tx);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        let changes = scheduler.changes.clone();
        tokio::spawn(async move {
            let result = watcher_task(source, changes, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let (watcher_result, scheduler_result) = tokio::join!(watcher_handle, scheduler.join());

    handle_join("watcher", watcher_result)?;
    scheduler_result
}

pub(crate) fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join {
            task,
            message: err.to_string(),
        }),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
