//! Single-file watcher feeding the scheduler.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use crate::error::{watch_err, DaemonError};
use crate::scheduler::ChangeNotification;

/// How long a re-arm waits for a replaced file to reappear.
const REARM_GRACE: Duration = Duration::from_millis(500);
const REARM_POLL: Duration = Duration::from_millis(20);

/// What a raw watcher event means for the monitored file.
#[derive(Debug)]
pub enum WatchEvent {
    /// Contents or metadata changed; schedule a publish.
    Changed,
    /// The watched path no longer names the watched file (deleted, renamed
    /// away, or replaced by an atomic save). The watch must be re-armed.
    Deleted,
    Error(notify::Error),
    Ignored,
}

pub fn classify(event: notify::Result<Event>) -> WatchEvent {
    let event = match event {
        Ok(event) => event,
        Err(err) => return WatchEvent::Error(err),
    };
    match event.kind {
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => WatchEvent::Deleted,
        EventKind::Create(_) | EventKind::Modify(_) => WatchEvent::Changed,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => WatchEvent::Ignored,
    }
}

/// Watch `source` and send a [`ChangeNotification`] for every change.
///
/// A deletion re-arms the subscription on the same path. Failing to re-arm is
/// fatal: the daemon would otherwise sit there watching nothing.
pub async fn watcher_task(
    source: PathBuf,
    changes: mpsc::Sender<ChangeNotification>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })
    .map_err(|e| watch_err(&source, e))?;

    subscribe(&mut watcher, &source)?;
    tracing::info!(path = %source.display(), "watching proxy file");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match classify(event) {
                    WatchEvent::Changed => {
                        tracing::debug!(path = %source.display(), "proxy file changed");
                        if changes.send(ChangeNotification).await.is_err() {
                            break;
                        }
                    }
                    WatchEvent::Deleted => {
                        tracing::info!(path = %source.display(), "proxy file replaced or removed; re-arming watch");
                        resubscribe(&mut watcher, &source).await?;
                    }
                    WatchEvent::Error(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                    }
                    WatchEvent::Ignored => {}
                }
            }
        }
    }

    Ok(())
}

fn subscribe(watcher: &mut RecommendedWatcher, source: &Path) -> Result<(), DaemonError> {
    watcher
        .watch(source, RecursiveMode::NonRecursive)
        .map_err(|e| watch_err(source, e))
}

async fn resubscribe(watcher: &mut RecommendedWatcher, source: &Path) -> Result<(), DaemonError> {
    // The backend may already have dropped the watch on its own.
    let _ = watcher.unwatch(source);

    let deadline = Instant::now() + REARM_GRACE;
    while !source.exists() && Instant::now() < deadline {
        tokio::time::sleep(REARM_POLL).await;
    }
    subscribe(watcher, source)
}
