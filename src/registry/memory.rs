/*!
 * In-Memory Registry
 * Process-local registry with a host or manually driven clock
 */

use super::traits::RegistryClient;
use super::types::{ProcessRecord, ProcessStatus};
use crate::core::errors::{StoreError, StoreResult};
use crate::core::types::{Pid, RecordId, Timestamp};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug)]
enum Clock {
    System,
    Manual(AtomicI64),
}

#[derive(Debug)]
struct Inner {
    records: RwLock<Vec<ProcessRecord>>,
    clock: Clock,
}

/// In-memory process registry
#[derive(Debug, Clone)]
pub struct MemoryRegistry {
    inner: Arc<Inner>,
}

impl MemoryRegistry {
    /// Registry whose clock follows the host clock
    pub fn new() -> Self {
        Self::with_clock(Clock::System)
    }

    /// Registry whose clock is pinned at `now` until moved explicitly
    pub fn with_fixed_time(now: Timestamp) -> Self {
        Self::with_clock(Clock::Manual(AtomicI64::new(now)))
    }

    fn with_clock(clock: Clock) -> Self {
        Self {
            inner: Arc::new(Inner {
                records: RwLock::new(Vec::new()),
                clock,
            }),
        }
    }

    /// Move a manual clock to `now`. No effect on a host clock
    pub fn set_time(&self, now: Timestamp) {
        if let Clock::Manual(ref t) = self.inner.clock {
            t.store(now, Ordering::SeqCst);
        }
    }

    /// Advance a manual clock by `secs`. No effect on a host clock
    pub fn advance(&self, secs: i64) {
        if let Clock::Manual(ref t) = self.inner.clock {
            t.fetch_add(secs, Ordering::SeqCst);
        }
    }

    /// Look up a record by identifier
    pub fn get(&self, id: RecordId) -> Option<ProcessRecord> {
        self.inner
            .records
            .read()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.records.read().is_empty()
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryClient for MemoryRegistry {
    fn now(&self) -> StoreResult<Timestamp> {
        match self.inner.clock {
            Clock::Manual(ref t) => Ok(t.load(Ordering::SeqCst)),
            Clock::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as Timestamp)
                .map_err(|e| StoreError::Unavailable(format!("host clock before epoch: {}", e))),
        }
    }

    fn insert_running(&self, pid: Pid, start_time: Timestamp) -> StoreResult<RecordId> {
        let mut records = self.inner.records.write();
        let id = records.last().map_or(1, |r| r.id + 1);
        records.push(ProcessRecord {
            id,
            pid,
            status: ProcessStatus::Running,
            start_time,
        });
        Ok(id)
    }

    fn find_stale_running(&self, older_than: Timestamp) -> StoreResult<Vec<ProcessRecord>> {
        let mut stale: Vec<ProcessRecord> = self
            .inner
            .records
            .read()
            .iter()
            .filter(|r| r.is_running() && r.start_time < older_than)
            .cloned()
            .collect();
        stale.sort_by_key(|r| (r.start_time, r.id));
        Ok(stale)
    }

    fn mark_reclaimed(&self, pid: Pid) -> StoreResult<u64> {
        let mut changed = 0;
        for record in self.inner.records.write().iter_mut() {
            if record.pid == pid && record.is_running() {
                record.status = ProcessStatus::Reclaimed;
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn count_running(&self) -> StoreResult<u64> {
        Ok(self
            .inner
            .records
            .read()
            .iter()
            .filter(|r| r.is_running())
            .count() as u64)
    }

    fn records(&self) -> StoreResult<Vec<ProcessRecord>> {
        Ok(self.inner.records.read().clone())
    }
}
