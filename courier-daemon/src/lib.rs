//! Courier daemon runtime: proxy-file watcher + publish scheduler + cycle worker.

mod error;
mod runtime;
pub mod scheduler;
pub mod watcher;

pub use error::DaemonError;
pub use runtime::{run, run_with, start_blocking, PublishCycle};
pub use scheduler::{ChangeNotification, CycleRunner, CycleState, Scheduler, QUIESCENCE_WINDOW};
