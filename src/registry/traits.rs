/*!
 * Registry Traits
 * Query contract every registry backend must satisfy
 */

use super::types::ProcessRecord;
use crate::core::errors::StoreResult;
use crate::core::types::{Pid, RecordId, Timestamp};

/// Persistent registry of launched worker instances.
///
/// Every operation is atomic on its own; callers never hold a lock across
/// operations. Time is always read from the registry, never from the host.
#[cfg_attr(test, mockall::automock)]
pub trait RegistryClient: Send + Sync {
    /// Current registry time in epoch seconds
    fn now(&self) -> StoreResult<Timestamp>;

    /// Insert a running record and return its identifier
    fn insert_running(&self, pid: Pid, start_time: Timestamp) -> StoreResult<RecordId>;

    /// Running records with `start_time < older_than`, oldest first
    fn find_stale_running(&self, older_than: Timestamp) -> StoreResult<Vec<ProcessRecord>>;

    /// Mark the running record(s) for `pid` as reclaimed; returns rows changed
    fn mark_reclaimed(&self, pid: Pid) -> StoreResult<u64>;

    /// Number of running records
    fn count_running(&self) -> StoreResult<u64>;

    /// All records ordered by identifier
    fn records(&self) -> StoreResult<Vec<ProcessRecord>>;
}
