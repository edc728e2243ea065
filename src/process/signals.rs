/*!
 * Process Signalling
 * Forceful OS-level termination of worker processes
 */

use super::traits::ProcessSignaller;
use super::types::SignalOutcome;
use crate::core::errors::{SignalError, SignalResult};
use crate::core::types::Pid;
use tracing::{debug, warn};

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{kill, Signal as UnixSignal};
#[cfg(unix)]
use nix::unistd::Pid as NixPid;

/// Sends SIGKILL to the worker's top-level process only
#[derive(Debug, Clone, Default)]
pub struct OsSignaller;

impl OsSignaller {
    pub fn new() -> Self {
        Self
    }

    /// Reject pids that would address a process group or the supervisor itself
    fn checked_pid(pid: Pid) -> SignalResult<i32> {
        if pid == 0 || pid == std::process::id() {
            return Err(SignalError::InvalidPid(pid));
        }
        i32::try_from(pid).map_err(|_| SignalError::InvalidPid(pid))
    }
}

impl ProcessSignaller for OsSignaller {
    #[cfg(unix)]
    fn terminate(&self, pid: Pid) -> SignalResult<SignalOutcome> {
        let raw = Self::checked_pid(pid)?;

        match kill(NixPid::from_raw(raw), UnixSignal::SIGKILL) {
            Ok(()) => {
                debug!(pid, "Sent SIGKILL");
                Ok(SignalOutcome::Delivered)
            }
            Err(Errno::ESRCH) => {
                debug!(pid, "Process already gone");
                Ok(SignalOutcome::AlreadyGone)
            }
            Err(Errno::EPERM) => {
                warn!(pid, "Permission denied sending SIGKILL");
                Err(SignalError::PermissionDenied(pid))
            }
            Err(e) => {
                warn!(pid, error = %e, "Failed to send SIGKILL");
                Err(SignalError::Failed {
                    pid,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Non-Unix stub
    #[cfg(not(unix))]
    fn terminate(&self, pid: Pid) -> SignalResult<SignalOutcome> {
        Self::checked_pid(pid)?;
        warn!(pid, "Process termination not supported on this platform");
        Err(SignalError::Unsupported)
    }
}
