//! Snapshot the proxy file and compile the snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{io_err, PublishError};
use crate::tools::Compiler;

/// Copy the current bytes of `source` over `snapshot`.
///
/// The snapshot is replaced wholesale each cycle; later edits to the source
/// do not leak into a compile that is already under way.
pub fn take_snapshot(source: &Path, snapshot: &Path) -> Result<(), PublishError> {
    fs::copy(source, snapshot).map_err(|e| io_err(snapshot, e))?;
    tracing::debug!("snapshot: {} -> {}", source.display(), snapshot.display());
    Ok(())
}

/// Compile `snapshot`, returning the artifact path.
pub fn compile(compiler: &dyn Compiler, snapshot: &Path) -> Result<PathBuf, PublishError> {
    match compiler.compile(snapshot) {
        Ok(artifact) => {
            tracing::info!("successfully compiled: {}", artifact.display());
            Ok(artifact)
        }
        Err(err) => {
            tracing::error!("compile broken: {err}");
            Err(PublishError::Compile(err))
        }
    }
}
