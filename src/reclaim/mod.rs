/*!
 * Staleness Reclaimer
 *
 * Finds running records older than the staleness window, forcefully
 * terminates their processes and marks them reclaimed in the registry.
 *
 * # Partial failure
 *
 * Every record is processed independently. A failed signal or update is
 * recorded in the `ReclaimReport` and the pass moves on to the next record.
 * The registry update is attempted even when the signal fails, so a record
 * whose process cannot be signalled does not come back every round.
 */

use crate::core::errors::{SignalError, StoreError, StoreResult};
use crate::core::serde::is_empty_vec;
use crate::core::types::{Pid, StalenessWindow, Timestamp};
use crate::process::{ProcessSignaller, SignalOutcome};
use crate::registry::RegistryClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Why a record could not be cleanly reclaimed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "error", rename_all = "snake_case")]
pub enum FailureKind {
    /// Signal failed; the registry update was still attempted and succeeded
    Signal(SignalError),
    /// Process is gone but the registry still says running
    Inconsistent(StoreError),
    /// Signal and registry update both failed
    Update {
        signal: SignalError,
        store: StoreError,
    },
}

/// A record the pass could not cleanly reclaim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReclaimFailure {
    pub pid: Pid,
    pub kind: FailureKind,
}

/// Outcome of one reclamation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReclaimReport {
    /// Registry time the pass ran at
    pub now: Timestamp,
    /// Records started strictly before this were stale
    pub threshold: Timestamp,
    /// Stale records returned by the registry
    pub examined: usize,
    /// Signals delivered to live processes
    pub signalled: usize,
    /// Records whose process had already exited
    pub already_gone: usize,
    /// Records transitioned to reclaimed
    pub reclaimed: usize,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub failures: Vec<ReclaimFailure>,
}

impl ReclaimReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Records left running in the registry after their process was terminated
    pub fn inconsistencies(&self) -> impl Iterator<Item = &ReclaimFailure> {
        self.failures
            .iter()
            .filter(|f| matches!(f.kind, FailureKind::Inconsistent(_)))
    }
}

/// Reclaims workers whose registry records outlived the staleness window
pub struct StalenessReclaimer {
    registry: Arc<dyn RegistryClient>,
    signaller: Arc<dyn ProcessSignaller>,
}

impl StalenessReclaimer {
    pub fn new(registry: Arc<dyn RegistryClient>, signaller: Arc<dyn ProcessSignaller>) -> Self {
        Self {
            registry,
            signaller,
        }
    }

    /// Run one reclamation pass.
    ///
    /// Fails only when the registry clock or the stale query fails, in which
    /// case no process is signalled.
    pub fn reclaim(&self, window: StalenessWindow) -> StoreResult<ReclaimReport> {
        let now = self.registry.now()?;
        let threshold = window.threshold(now);
        let stale = self.registry.find_stale_running(threshold)?;

        let mut report = ReclaimReport {
            now,
            threshold,
            examined: stale.len(),
            ..ReclaimReport::default()
        };

        if stale.is_empty() {
            debug!(now, threshold, "No stale workers");
            return Ok(report);
        }

        info!(
            count = stale.len(),
            now,
            threshold,
            window_secs = window.as_secs(),
            "Reclaiming stale workers"
        );

        for record in stale {
            self.reclaim_one(record.pid, record.start_time, &mut report);
        }

        if report.is_clean() {
            info!(reclaimed = report.reclaimed, "Reclamation pass complete");
        } else {
            warn!(
                reclaimed = report.reclaimed,
                failures = report.failures.len(),
                "Reclamation pass completed with failures"
            );
        }

        Ok(report)
    }

    fn reclaim_one(&self, pid: Pid, start_time: Timestamp, report: &mut ReclaimReport) {
        let signal = self.signaller.terminate(pid);
        match signal {
            Ok(SignalOutcome::Delivered) => report.signalled += 1,
            Ok(SignalOutcome::AlreadyGone) => report.already_gone += 1,
            Err(ref e) => warn!(pid, error = %e, "Failed to terminate stale worker"),
        }

        match (signal, self.registry.mark_reclaimed(pid)) {
            (Ok(outcome), Ok(changed)) => {
                if changed > 0 {
                    report.reclaimed += 1;
                }
                debug!(pid, start_time, ?outcome, changed, "Worker reclaimed");
            }
            (Ok(_), Err(e)) => {
                error!(
                    pid,
                    error = %e,
                    "Worker terminated but registry still marks it running"
                );
                report.failures.push(ReclaimFailure {
                    pid,
                    kind: FailureKind::Inconsistent(e),
                });
            }
            (Err(signal), Ok(changed)) => {
                if changed > 0 {
                    report.reclaimed += 1;
                }
                report.failures.push(ReclaimFailure {
                    pid,
                    kind: FailureKind::Signal(signal),
                });
            }
            (Err(signal), Err(store)) => {
                error!(pid, error = %store, "Failed to mark unsignalled worker reclaimed");
                report.failures.push(ReclaimFailure {
                    pid,
                    kind: FailureKind::Update { signal, store },
                });
            }
        }
    }
}
