/*!
 * Shared test fixtures
 */

#![allow(dead_code)]

use battle_supervisor::core::errors::{LaunchError, LaunchResult, SignalResult, StoreError, StoreResult};
use battle_supervisor::core::types::{Pid, RecordId, Timestamp};
use battle_supervisor::process::{
    ExitedWorker, LaunchedWorker, ProcessSignaller, SignalOutcome, WorkerSpawner,
};
use battle_supervisor::registry::{ProcessRecord, RegistryClient};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

/// Records every termination request and pretends it was delivered
#[derive(Default)]
pub struct RecordingSignaller {
    pub sent: Mutex<Vec<Pid>>,
    pub gone: HashSet<Pid>,
}

impl RecordingSignaller {
    pub fn with_gone(gone: impl IntoIterator<Item = Pid>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            gone: gone.into_iter().collect(),
        }
    }

    pub fn sent(&self) -> Vec<Pid> {
        self.sent.lock().clone()
    }
}

impl ProcessSignaller for RecordingSignaller {
    fn terminate(&self, pid: Pid) -> SignalResult<SignalOutcome> {
        self.sent.lock().push(pid);
        if self.gone.contains(&pid) {
            Ok(SignalOutcome::AlreadyGone)
        } else {
            Ok(SignalOutcome::Delivered)
        }
    }
}

/// Registry wrapper whose `mark_reclaimed` fails for chosen pids
pub struct FlakyRegistry<R> {
    pub inner: R,
    pub failing: HashSet<Pid>,
}

impl<R: RegistryClient> RegistryClient for FlakyRegistry<R> {
    fn now(&self) -> StoreResult<Timestamp> {
        self.inner.now()
    }

    fn insert_running(&self, pid: Pid, start_time: Timestamp) -> StoreResult<RecordId> {
        self.inner.insert_running(pid, start_time)
    }

    fn find_stale_running(&self, older_than: Timestamp) -> StoreResult<Vec<ProcessRecord>> {
        self.inner.find_stale_running(older_than)
    }

    fn mark_reclaimed(&self, pid: Pid) -> StoreResult<u64> {
        if self.failing.contains(&pid) {
            return Err(StoreError::Unavailable("database is locked".to_string()));
        }
        self.inner.mark_reclaimed(pid)
    }

    fn count_running(&self) -> StoreResult<u64> {
        self.inner.count_running()
    }

    fn records(&self) -> StoreResult<Vec<ProcessRecord>> {
        self.inner.records()
    }
}

/// Spawner handing out fake pids, failing on chosen instance indexes
pub struct FakeSpawner {
    next_pid: AtomicU32,
    failing: HashSet<u32>,
    pub launched: Mutex<Vec<LaunchedWorker>>,
    exited: Mutex<Vec<ExitedWorker>>,
}

impl FakeSpawner {
    pub fn new(first_pid: Pid) -> Self {
        Self::failing_on(first_pid, [])
    }

    pub fn failing_on(first_pid: Pid, indexes: impl IntoIterator<Item = u32>) -> Self {
        Self {
            next_pid: AtomicU32::new(first_pid),
            failing: indexes.into_iter().collect(),
            launched: Mutex::new(Vec::new()),
            exited: Mutex::new(Vec::new()),
        }
    }

    /// Make a launched worker exit; the next `reap_exited` returns it
    pub fn exit(&self, pid: Pid) {
        let mut launched = self.launched.lock();
        if let Some(pos) = launched.iter().position(|w| w.pid == pid) {
            let worker = launched.remove(pos);
            self.exited.lock().push(ExitedWorker {
                pid,
                instance_index: worker.instance_index,
                exit_code: Some(0),
            });
        }
    }

    /// Hand out `pid` on the next launch, as the OS does after a pid is freed
    pub fn reuse_pid(&self, pid: Pid) {
        self.next_pid.store(pid, Ordering::SeqCst);
    }
}

impl WorkerSpawner for FakeSpawner {
    fn launch(&self, instance_index: u32, log_dir: &Path) -> LaunchResult<LaunchedWorker> {
        if self.failing.contains(&instance_index) {
            return Err(LaunchError::SpawnFailed {
                command: "java".to_string(),
                reason: "Resource temporarily unavailable".to_string(),
            });
        }
        let worker = LaunchedWorker {
            pid: self.next_pid.fetch_add(1, Ordering::SeqCst),
            instance_index,
            log_path: log_dir.join(format!("instance_{}.log", instance_index)),
        };
        self.launched.lock().push(worker.clone());
        Ok(worker)
    }

    fn reap_exited(&self) -> Vec<ExitedWorker> {
        std::mem::take(&mut *self.exited.lock())
    }

    fn tracked(&self) -> usize {
        self.launched.lock().len()
    }
}
