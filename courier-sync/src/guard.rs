//! Conflict guard: refuse to publish over edits made directly on the remote.

use std::path::Path;

use crate::error::ToolError;
use crate::tools::DiffService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    /// The baseline differs from the fresh artifact; carries the patch.
    Unsafe(String),
}

/// Compare `artifact` against `baseline`, if a baseline exists.
///
/// No baseline means nothing to protect. An empty diff means the remote
/// already holds exactly what courier would publish.
pub fn check_safe(
    differ: &dyn DiffService,
    artifact: &Path,
    baseline: Option<&Path>,
) -> Result<Verdict, ToolError> {
    let Some(baseline) = baseline else {
        return Ok(Verdict::Safe);
    };
    let diff = differ.diff(baseline, artifact)?;
    if diff.differs {
        Ok(Verdict::Unsafe(diff.patch))
    } else {
        Ok(Verdict::Safe)
    }
}
