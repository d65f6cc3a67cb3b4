//! Error types for courier-sync.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

use courier_core::DescriptorError;

/// Failure of a single external-tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started or waited on.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully.
    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },

    /// The program did not finish before its deadline and was killed.
    #[error("{program} timed out after {after:?}")]
    TimedOut { program: String, after: Duration },

    /// The program reported success but its expected output is missing.
    #[error("{program} produced no output at {path}")]
    MissingOutput { program: String, path: PathBuf },

    /// An in-process tool could not read or write a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a publish cycle stopped short of uploading.
///
/// Every variant is contained within its cycle; only
/// [`PublishError::ConflictDetected`] recurs on later cycles, until the
/// baseline file is removed by hand.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid remote descriptor: {0}")]
    InvalidDescriptor(#[from] DescriptorError),

    #[error("compile failed: {0}")]
    Compile(#[source] ToolError),

    #[error("could not mount {identity}: {source}")]
    Mount {
        identity: String,
        #[source]
        source: ToolError,
    },

    #[error(
        "remote copy was edited outside courier; delete {} to publish anyway",
        baseline.display()
    )]
    ConflictDetected { baseline: PathBuf, diff: String },

    #[error("copy to {destination} failed: {source}")]
    Copy {
        destination: String,
        #[source]
        source: ToolError,
    },

    #[error("diff against baseline failed: {0}")]
    Diff(#[source] ToolError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`PublishError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PublishError {
    PublishError::Io {
        path: path.into(),
        source,
    }
}
