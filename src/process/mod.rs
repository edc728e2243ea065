/*!
 * Process Module
 * Worker launching, reaping and OS-level termination
 */

pub mod launcher;
pub mod signals;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use launcher::{log_path, WorkerLauncher};
pub use signals::OsSignaller;
pub use traits::{ProcessSignaller, WorkerSpawner};
pub use types::{ExitedWorker, LaunchedWorker, SignalOutcome};

#[cfg(test)]
pub use traits::{MockProcessSignaller, MockWorkerSpawner};
