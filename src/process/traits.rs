/*!
 * Process Traits
 * Worker launch and termination abstractions
 */

use super::types::{ExitedWorker, LaunchedWorker, SignalOutcome};
use crate::core::errors::{LaunchResult, SignalResult};
use crate::core::types::Pid;
use std::path::Path;

/// Starts detached worker instances
#[cfg_attr(test, mockall::automock)]
pub trait WorkerSpawner: Send + Sync {
    /// Start instance `instance_index`, logging into `log_dir`
    fn launch(&self, instance_index: u32, log_dir: &Path) -> LaunchResult<LaunchedWorker>;

    /// Collect workers that have exited since the last call
    fn reap_exited(&self) -> Vec<ExitedWorker>;

    /// Number of launched workers not yet reaped
    fn tracked(&self) -> usize;
}

/// Sends forceful termination to OS processes
#[cfg_attr(test, mockall::automock)]
pub trait ProcessSignaller: Send + Sync {
    /// Terminate `pid` without giving it a chance to clean up
    fn terminate(&self, pid: Pid) -> SignalResult<SignalOutcome>;
}
