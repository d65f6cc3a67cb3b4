use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the watcher, scheduler, and runtime wiring.
///
/// Publish-cycle failures never show up here; they are logged per cycle.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to watch {path}: {source}")]
    WatchSetup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("{task} task join failure: {message}")]
    Join { task: &'static str, message: String },

    #[error("ctrl-c handler failed: {0}")]
    Signal(#[source] std::io::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn watch_err(path: impl Into<PathBuf>, source: notify::Error) -> DaemonError {
    DaemonError::WatchSetup {
        path: path.into(),
        source,
    }
}
