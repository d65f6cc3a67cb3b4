//! In-process unified diff between two files.

use std::io::ErrorKind;
use std::path::Path;

use similar::TextDiff;

use crate::error::ToolError;
use crate::tools::{DiffService, FileDiff};

/// Byte comparison via `fs::read`, line diff via `similar` for the patch.
///
/// Whether the files differ is decided on raw bytes; the text is only used to
/// show what changed. Bytes that do not decode render as U+FFFD.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDiffer;

impl DiffService for TextDiffer {
    fn diff(&self, old: &Path, new: &Path) -> Result<FileDiff, ToolError> {
        let before = read_existing_or_empty(old)?;
        let after = read_existing_or_empty(new)?;
        if before == after {
            return Ok(FileDiff {
                patch: String::new(),
                differs: false,
            });
        }

        let old_name = old.display().to_string();
        let new_name = new.display().to_string();
        let before = String::from_utf8_lossy(&before);
        let after = String::from_utf8_lossy(&after);

        let patch = if before == after {
            format!(
                "--- {old_name}\n+++ {new_name}\nfiles differ in bytes that do not decode as UTF-8\n"
            )
        } else {
            TextDiff::from_lines(before.as_ref(), after.as_ref())
                .unified_diff()
                .header(&old_name, &new_name)
                .context_radius(3)
                .to_string()
        };

        Ok(FileDiff {
            patch,
            differs: true,
        })
    }
}

fn read_existing_or_empty(path: &Path) -> Result<Vec<u8>, ToolError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(ToolError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
