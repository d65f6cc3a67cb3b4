//! Process-backed implementations of the tool traits.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use courier_core::MountIdentity;

use crate::error::ToolError;
use crate::process::{run_tool, TOOL_TIMEOUT};
use crate::tools::{Compiler, CopyService, MountService};

/// Runs `<program> <input>` and expects `<input stem>.<extension>` beside it.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    pub program: String,
    pub extension: String,
    pub timeout: Duration,
}

impl Default for ProcessCompiler {
    fn default() -> Self {
        Self {
            program: "stylus".to_string(),
            extension: "css".to_string(),
            timeout: TOOL_TIMEOUT,
        }
    }
}

impl Compiler for ProcessCompiler {
    fn artifact_extension(&self) -> &str {
        &self.extension
    }

    fn compile(&self, input: &Path) -> Result<PathBuf, ToolError> {
        run_tool(&self.program, [input], self.timeout)?;
        let artifact = input.with_extension(&self.extension);
        if !artifact.exists() {
            return Err(ToolError::MissingOutput {
                program: self.program.clone(),
                path: artifact,
            });
        }
        Ok(artifact)
    }
}

/// `gio mount` backed mount service.
#[derive(Debug, Clone)]
pub struct GioMounts {
    pub program: String,
    pub timeout: Duration,
}

impl Default for GioMounts {
    fn default() -> Self {
        Self {
            program: "gio".to_string(),
            timeout: TOOL_TIMEOUT,
        }
    }
}

impl MountService for GioMounts {
    fn mounted(&self) -> Result<BTreeSet<String>, ToolError> {
        let listing = run_tool(&self.program, ["mount", "-l"], self.timeout)?;
        Ok(parse_mount_list(&listing))
    }

    fn mount(&self, identity: &MountIdentity) -> Result<(), ToolError> {
        let uri = identity.uri();
        run_tool(&self.program, ["mount", uri.as_str()], self.timeout).map(drop)
    }
}

/// `gio copy` backed copy service; handles local paths and mounted URIs alike.
#[derive(Debug, Clone)]
pub struct GioCopier {
    pub program: String,
    pub timeout: Duration,
}

impl Default for GioCopier {
    fn default() -> Self {
        Self {
            program: "gio".to_string(),
            timeout: TOOL_TIMEOUT,
        }
    }
}

impl CopyService for GioCopier {
    fn copy(&self, from: &OsStr, to: &OsStr) -> Result<(), ToolError> {
        run_tool(&self.program, [OsStr::new("copy"), from, to], self.timeout).map(drop)
    }
}

/// Extract mount identities from `gio mount -l` output.
///
/// Mount lines look like `Mount(0): bob on host -> sftp://bob@host/`; the URI
/// after the arrow, minus its trailing slash, is the identity.
pub fn parse_mount_list(listing: &str) -> BTreeSet<String> {
    listing
        .lines()
        .filter(|line| line.trim_start().starts_with("Mount("))
        .filter_map(|line| line.split_once(" -> "))
        .map(|(_, uri)| uri.trim().trim_end_matches('/').to_string())
        .filter(|uri| uri.contains("://"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Drive(0): Samsung SSD
  Type: GProxyDrive (GProxyVolumeMonitorUDisks2)
Mount(0): alice on host -> gvfs://alice@host/
  Type: GDaemonMount
Mount(1): example.org -> sftp://example.org:2222/
  Type: GDaemonMount
Volume(0): Data
Mount(2): Data -> file:///media/data
";

    #[test]
    fn parses_uris_from_mount_lines_only() {
        let mounted = parse_mount_list(LISTING);
        let expected: BTreeSet<String> = [
            "gvfs://alice@host",
            "sftp://example.org:2222",
            "file:///media/data",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(mounted, expected);
    }

    #[test]
    fn membership_is_exact_not_substring() {
        let mounted = parse_mount_list(LISTING);
        assert!(mounted.contains("gvfs://alice@host"));
        assert!(!mounted.contains("gvfs://alice@ho"));
        assert!(!mounted.contains("sftp://example.org"));
    }

    #[test]
    fn empty_listing_has_no_mounts() {
        assert!(parse_mount_list("").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn compiler_reports_missing_artifact() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("bob-00000000.styl");
        std::fs::write(&input, "body\n").unwrap();

        let compiler = ProcessCompiler {
            program: "true".to_string(),
            ..ProcessCompiler::default()
        };
        let err = compiler.compile(&input).unwrap_err();
        assert!(matches!(err, ToolError::MissingOutput { .. }), "got: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn compiler_failure_is_propagated() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("bob-00000000.styl");
        std::fs::write(&input, "body\n").unwrap();

        let compiler = ProcessCompiler {
            program: "false".to_string(),
            ..ProcessCompiler::default()
        };
        let err = compiler.compile(&input).unwrap_err();
        assert!(matches!(err, ToolError::Failed { .. }), "got: {err}");
    }
}
