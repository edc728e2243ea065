/*!
 * Core Types
 * Common types used across the supervisor
 */

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OS process identifier
pub type Pid = u32;

/// Registry timestamp in whole seconds since the UNIX epoch
pub type Timestamp = i64;

/// Registry-assigned record identifier
pub type RecordId = i64;

/// Minimum age a running record must reach before it may be reclaimed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessWindow {
    secs: i64,
}

impl StalenessWindow {
    /// Window of an explicit number of seconds
    pub const fn from_secs(secs: i64) -> Self {
        Self { secs }
    }

    /// Window spanning `multiplier` full poll cycles
    pub fn from_poll_interval(poll_interval: Duration, multiplier: u32) -> Self {
        let secs = poll_interval
            .as_secs()
            .saturating_mul(u64::from(multiplier))
            .min(i64::MAX as u64) as i64;
        Self { secs }
    }

    #[inline]
    pub const fn as_secs(&self) -> i64 {
        self.secs
    }

    /// Records strictly older than the returned timestamp are stale at `now`
    #[inline]
    pub const fn threshold(&self, now: Timestamp) -> Timestamp {
        now.saturating_sub(self.secs)
    }

    /// Whether a record started at `start_time` is stale at `now`
    #[inline]
    pub const fn is_stale(&self, start_time: Timestamp, now: Timestamp) -> bool {
        start_time < self.threshold(now)
    }
}
