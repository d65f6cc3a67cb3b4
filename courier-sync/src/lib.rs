//! # courier-sync
//!
//! Blocking publish machinery: snapshot, compile, mount, guard, upload.
//!
//! Call [`Publisher::publish`] to run one cycle for a proxy file. External
//! tools sit behind the traits in [`tools`]; [`Toolchain::system`] wires the
//! real ones.

pub mod diff;
pub mod error;
pub mod guard;
pub mod mount;
pub mod pipeline;
pub mod process;
pub mod snapshot;
pub mod system;
pub mod tools;

pub use error::{PublishError, ToolError};
pub use guard::Verdict;
pub use mount::Reach;
pub use pipeline::{PublishReport, Publisher};
pub use tools::{Compiler, CopyService, DiffService, FileDiff, MountService, Toolchain};
