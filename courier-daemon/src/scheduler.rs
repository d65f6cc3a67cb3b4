//! Publish scheduler: serialises cycles and coalesces bursts of changes.
//!
//! | state              | input        | action                           | next               |
//! |--------------------|--------------|----------------------------------|--------------------|
//! | `Idle`             | change       | start a cycle after quiescence   | `Busy`             |
//! | `Busy`             | change       |                                  | `BusyPendingRerun` |
//! | `BusyPendingRerun` | change       |                                  | `BusyPendingRerun` |
//! | `Busy`             | finished     |                                  | `Idle`             |
//! | `BusyPendingRerun` | finished     | start a cycle immediately        | `Busy`             |
//!
//! The state lives in a single task and changes only in response to
//! messages; the cycle worker runs one cycle per start signal and reports
//! back when it is done. A pending rerun has capacity one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::DaemonError;
use crate::runtime::handle_join;

/// Pause between the first change and the cycle it triggers.
pub const QUIESCENCE_WINDOW: Duration = Duration::from_millis(50);

const CHANGE_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    #[default]
    Idle,
    Busy,
    BusyPendingRerun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerInput {
    Change,
    Finished,
}

/// How soon the worker should begin the cycle it is asked to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartCycle {
    AfterQuiescence,
    Immediately,
}

impl CycleState {
    /// Apply one input, returning the next state and whether to start a cycle.
    pub fn next(self, input: SchedulerInput) -> (CycleState, Option<StartCycle>) {
        use CycleState::*;
        use SchedulerInput::*;

        match (self, input) {
            (Idle, Change) => (Busy, Some(StartCycle::AfterQuiescence)),
            (Busy | BusyPendingRerun, Change) => (BusyPendingRerun, None),
            (Busy, Finished) => (Idle, None),
            (BusyPendingRerun, Finished) => (Busy, Some(StartCycle::Immediately)),
            (Idle, Finished) => (Idle, None),
        }
    }

    pub fn is_running(self) -> bool {
        !matches!(self, CycleState::Idle)
    }
}

/// Sent by the watcher for every change to the monitored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotification;

/// One publish cycle, run on a blocking thread.
///
/// Outcome handling belongs to the runner; the scheduler only learns that
/// the cycle is over.
pub trait CycleRunner: Send + Sync + 'static {
    fn run_cycle(&self);
}

/// Running scheduler + cycle worker pair.
pub struct Scheduler {
    pub changes: mpsc::Sender<ChangeNotification>,
    pub state: watch::Receiver<CycleState>,
    scheduler: JoinHandle<Result<(), DaemonError>>,
    worker: JoinHandle<Result<(), DaemonError>>,
}

impl Scheduler {
    /// Spawn both tasks. Either one exiting broadcasts shutdown.
    pub fn spawn<R: CycleRunner>(
        runner: Arc<R>,
        quiescence: Duration,
        shutdown: &broadcast::Sender<()>,
    ) -> Self {
        let (changes_tx, changes_rx) = mpsc::channel(CHANGE_QUEUE_DEPTH);
        let (start_tx, start_rx) = mpsc::channel(1);
        let (finished_tx, finished_rx) = mpsc::channel(1);
        let (state_tx, state_rx) = watch::channel(CycleState::Idle);

        let scheduler = {
            let shutdown = shutdown.clone();
            let shutdown_rx = shutdown.subscribe();
            tokio::spawn(async move {
                let result = scheduler_task(
                    changes_rx,
                    finished_rx,
                    start_tx,
                    state_tx,
                    quiescence,
                    shutdown_rx,
                )
                .await;
                let _ = shutdown.send(());
                result
            })
        };

        let worker = {
            let shutdown = shutdown.clone();
            let shutdown_rx = shutdown.subscribe();
            tokio::spawn(async move {
                let result = cycle_worker_task(runner, start_rx, finished_tx, shutdown_rx).await;
                let _ = shutdown.send(());
                result
            })
        };

        Self {
            changes: changes_tx,
            state: state_rx,
            scheduler,
            worker,
        }
    }

    pub async fn join(self) -> Result<(), DaemonError> {
        let Self {
            scheduler, worker, ..
        } = self;
        let (scheduler_result, worker_result) = tokio::join!(scheduler, worker);
        handle_join("scheduler", scheduler_result)?;
        handle_join("cycle_worker", worker_result)
    }
}

async fn scheduler_task(
    mut changes: mpsc::Receiver<ChangeNotification>,
    mut finished: mpsc::Receiver<()>,
    start: mpsc::Sender<Duration>,
    state_tx: watch::Sender<CycleState>,
    quiescence: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut state = CycleState::Idle;

    loop {
        let input = tokio::select! {
            _ = shutdown_rx.recv() => break,
            change = changes.recv() => match change {
                Some(ChangeNotification) => SchedulerInput::Change,
                None => break,
            },
            done = finished.recv() => match done {
                Some(()) => SchedulerInput::Finished,
                None => break,
            },
        };

        if state == CycleState::Idle && input == SchedulerInput::Finished {
            tracing::warn!("cycle finished while scheduler was idle; ignoring");
        }

        let (next, action) = state.next(input);
        if next != state {
            tracing::debug!(from = ?state, to = ?next, "scheduler transition");
        }
        state = next;
        state_tx.send_replace(state);

        if let Some(action) = action {
            let delay = match action {
                StartCycle::AfterQuiescence => quiescence,
                StartCycle::Immediately => {
                    tracing::info!("changes arrived during the last cycle; publishing again");
                    Duration::ZERO
                }
            };
            if start.send(delay).await.is_err() {
                // The worker drops its end when it shuts down first.
                if shutdown_requested(&mut shutdown_rx) {
                    break;
                }
                return Err(DaemonError::ChannelClosed("cycle start"));
            }
        }
    }

    Ok(())
}

fn shutdown_requested(shutdown_rx: &mut broadcast::Receiver<()>) -> bool {
    !matches!(shutdown_rx.try_recv(), Err(broadcast::error::TryRecvError::Empty))
}

async fn cycle_worker_task<R: CycleRunner>(
    runner: Arc<R>,
    mut start: mpsc::Receiver<Duration>,
    finished: mpsc::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            delay = start.recv() => {
                let Some(delay) = delay else { break };
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                // No cancellation: once started, a cycle always runs to the end.
                let runner = runner.clone();
                if let Err(err) = tokio::task::spawn_blocking(move || runner.run_cycle()).await {
                    tracing::error!(error = %err, "publish cycle panicked");
                }

                if finished.send(()).await.is_err() {
                    break;
                }
            }
        }
    }

    Ok(())
}
