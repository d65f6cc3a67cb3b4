//! One publish cycle, end to end.
//!
//! Strictly in order:
//!
//! 1. Parse the descriptor from the proxy file's first line.
//! 2. Snapshot the proxy file.
//! 3. Compile the snapshot (abort on failure).
//! 4. Make the target reachable, capturing a baseline on a mount transition
//!    (abort on failure).
//! 5. With a `-upstream` baseline beside the artifact, run the conflict guard;
//!    without one, publish directly.
//! 6. Copy the artifact to the target and log the upload, then delete the
//!    artifact and, when the guard ran, the baseline.
//!
//! An aborted cycle leaves the artifact behind; a conflict also leaves the
//! baseline, which keeps blocking until someone deletes it.

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use courier_core::{upstream_sibling, RemoteDescriptor, TargetLayout};

use crate::error::{io_err, PublishError};
use crate::guard::{check_safe, Verdict};
use crate::mount::{ensure_reachable, Reach};
use crate::snapshot::{compile, take_snapshot};
use crate::tools::Toolchain;

/// Outcome of a cycle that reached the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Where the artifact went, with any password redacted.
    pub destination: String,
    pub reach: Reach,
    /// Whether a matching baseline was consumed by this publish.
    pub baseline_cleared: bool,
}

/// Runs publish cycles for proxy files using a fixed [`Toolchain`].
pub struct Publisher {
    tools: Toolchain,
}

impl Publisher {
    pub fn new(tools: Toolchain) -> Self {
        Self { tools }
    }

    pub fn system() -> Self {
        Self::new(Toolchain::system())
    }

    /// Layout the next cycle for `source` would use.
    pub fn layout_for(&self, source: &Path) -> Result<TargetLayout, PublishError> {
        let descriptor = RemoteDescriptor::read_from(source)?;
        Ok(TargetLayout::new(
            source,
            &descriptor,
            self.tools.compiler.artifact_extension(),
        ))
    }

    /// Run one cycle for the proxy file at `source`.
    pub fn publish(&self, source: &Path) -> Result<PublishReport, PublishError> {
        let descriptor = RemoteDescriptor::read_from(source)?;
        let layout = TargetLayout::new(
            source,
            &descriptor,
            self.tools.compiler.artifact_extension(),
        );

        take_snapshot(source, &layout.snapshot)?;
        let artifact = compile(self.tools.compiler.as_ref(), &layout.snapshot)?;
        let baseline = upstream_sibling(&artifact);

        let reach = ensure_reachable(
            self.tools.mounts.as_ref(),
            self.tools.copier.as_ref(),
            &descriptor,
            &baseline,
        )?;
        let (destination, shown): (OsString, String) = match &reach {
            Reach::Local(path) => (path.clone().into(), path.display().to_string()),
            Reach::AlreadyMounted | Reach::Mounted { .. } => {
                (descriptor.location().into(), descriptor.to_string())
            }
        };

        let guarded = baseline.exists();
        let verdict = check_safe(
            self.tools.differ.as_ref(),
            &artifact,
            guarded.then_some(baseline.as_path()),
        )
        .map_err(PublishError::Diff)?;
        if let Verdict::Unsafe(diff) = verdict {
            return Err(PublishError::ConflictDetected { baseline, diff });
        }

        self.tools
            .copier
            .copy(artifact.as_os_str(), &destination)
            .map_err(|source| PublishError::Copy {
                destination: shown.clone(),
                source,
            })?;

        tracing::info!("uploaded {} to {shown}", artifact.display());

        // The remote already holds the artifact; a leftover local copy is
        // only clutter and is overwritten next cycle.
        if let Err(err) = remove(&artifact) {
            tracing::warn!("could not clean up after upload: {err}");
        }
        // A stale baseline would block the next cycle, so this one fails it.
        if guarded {
            remove(&baseline)?;
        }

        Ok(PublishReport {
            destination: shown,
            reach,
            baseline_cleared: guarded,
        })
    }
}

fn remove(path: &Path) -> Result<(), PublishError> {
    fs::remove_file(path).map_err(|e| io_err(path, e))
}
