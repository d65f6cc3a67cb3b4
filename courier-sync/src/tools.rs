//! Seams for the external tools a publish cycle shells out to.
//!
//! Each tool is a trait so tests can swap in fakes; [`Toolchain::system`]
//! wires the process-backed defaults.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use courier_core::MountIdentity;

use crate::diff::TextDiffer;
use crate::error::ToolError;
use crate::system::{GioCopier, GioMounts, ProcessCompiler};

/// Compiles a snapshot into an artifact.
pub trait Compiler: Send + Sync {
    /// Extension the compiled artifact carries, without the dot.
    fn artifact_extension(&self) -> &str;

    /// Compile `input`, returning the path of the artifact it produced.
    fn compile(&self, input: &Path) -> Result<PathBuf, ToolError>;
}

/// Lists and creates mounts of remote locations.
pub trait MountService: Send + Sync {
    /// Password-free identities (`scheme://[user@]host`) currently mounted.
    fn mounted(&self) -> Result<BTreeSet<String>, ToolError>;

    fn mount(&self, identity: &MountIdentity) -> Result<(), ToolError>;
}

/// Copies between local paths and mounted remote locations.
pub trait CopyService: Send + Sync {
    fn copy(&self, from: &OsStr, to: &OsStr) -> Result<(), ToolError>;
}

/// Result of comparing two files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub patch: String,
    pub differs: bool,
}

/// Produces a textual patch between two files.
pub trait DiffService: Send + Sync {
    fn diff(&self, old: &Path, new: &Path) -> Result<FileDiff, ToolError>;
}

/// The full set of collaborators a publish cycle needs.
pub struct Toolchain {
    pub compiler: Box<dyn Compiler>,
    pub mounts: Box<dyn MountService>,
    pub copier: Box<dyn CopyService>,
    pub differ: Box<dyn DiffService>,
}

impl Toolchain {
    /// `stylus` for compiling, `gio` for mounting and copying, and an
    /// in-process line diff.
    pub fn system() -> Self {
        Self {
            compiler: Box::new(ProcessCompiler::default()),
            mounts: Box::new(GioMounts::default()),
            copier: Box::new(GioCopier::default()),
            differ: Box::new(TextDiffer),
        }
    }
}
