//! Make the publish target reachable, capturing a baseline on first mount.
//!
//! The baseline freezes the remote artifact as it was before courier started
//! managing it. It is taken only on a mount transition, never refreshed, and
//! never overwritten while one is already on disk.

use std::ffi::OsStr;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use courier_core::RemoteDescriptor;

use crate::error::PublishError;
use crate::tools::{CopyService, MountService};

/// How the target was reached this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reach {
    /// The descriptor names a local path; nothing was mounted.
    Local(PathBuf),
    /// The remote was already in the mount list.
    AlreadyMounted,
    /// This cycle mounted the remote.
    Mounted { baseline_captured: bool },
}

pub fn ensure_reachable(
    mounts: &dyn MountService,
    copier: &dyn CopyService,
    descriptor: &RemoteDescriptor,
    baseline: &Path,
) -> Result<Reach, PublishError> {
    if let Some(path) = descriptor.local_path() {
        tracing::debug!("local target {}, skipping mount", path.display());
        return Ok(Reach::Local(path));
    }

    let identity = descriptor.mount_identity();
    let mount_err = |source| PublishError::Mount {
        identity: identity.to_string(),
        source,
    };

    let mounted = mounts.mounted().map_err(mount_err)?;
    if mounted.contains(&identity.key()) {
        return Ok(Reach::AlreadyMounted);
    }

    mounts.mount(&identity).map_err(mount_err)?;
    tracing::info!("mounted {identity}");

    let baseline_captured = capture_baseline(copier, descriptor, baseline);
    Ok(Reach::Mounted { baseline_captured })
}

/// Fetch the remote artifact into `baseline`, unless one is already kept.
///
/// Returns whether a baseline is on disk afterwards.
fn capture_baseline(
    copier: &dyn CopyService,
    descriptor: &RemoteDescriptor,
    baseline: &Path,
) -> bool {
    if baseline.exists() {
        tracing::info!("keeping existing upstream baseline {}", baseline.display());
        return true;
    }

    match copier.copy(OsStr::new(descriptor.location()), baseline.as_os_str()) {
        Ok(()) => {
            tracing::info!(
                "captured upstream baseline of {descriptor} at {}",
                baseline.display()
            );
            true
        }
        Err(err) => {
            tracing::info!("nothing to back up at {descriptor}: {err}");
            match fs::remove_file(baseline) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("could not remove partial baseline: {e}"),
            }
            false
        }
    }
}
