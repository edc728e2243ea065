/*!
 * Registry Types
 * Process records as stored in the shared registry
 */

use crate::core::errors::{StoreError, StoreResult};
use crate::core::types::{Pid, RecordId, Timestamp};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a tracked worker instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Launched and eligible for reclamation once stale
    Running,
    /// Reserved for a worker-reported natural exit; never written by the supervisor
    Completed,
    /// Terminated by the reclaimer
    Reclaimed,
}

impl ProcessStatus {
    /// Integer code stored in the registry
    #[inline]
    pub const fn code(self) -> i64 {
        match self {
            Self::Running => 0,
            Self::Completed => 1,
            Self::Reclaimed => 2,
        }
    }

    pub fn from_code(code: i64) -> StoreResult<Self> {
        match code {
            0 => Ok(Self::Running),
            1 => Ok(Self::Completed),
            2 => Ok(Self::Reclaimed),
            other => Err(StoreError::Corrupt(format!("unknown status code {}", other))),
        }
    }
}

/// One tracked worker instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessRecord {
    pub id: RecordId,
    pub pid: Pid,
    pub status: ProcessStatus,
    pub start_time: Timestamp,
}

impl ProcessRecord {
    #[inline]
    pub fn is_running(&self) -> bool {
        self.status == ProcessStatus::Running
    }
}
