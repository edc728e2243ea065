/*!
 * Process Types
 * Common types for worker launch and termination
 */

use crate::core::types::Pid;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A freshly launched worker instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LaunchedWorker {
    pub pid: Pid,
    pub instance_index: u32,
    pub log_path: PathBuf,
}

/// A launched worker whose exit has been collected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExitedWorker {
    pub pid: Pid,
    pub instance_index: u32,
    /// None when the worker was ended by a signal
    #[serde(skip_serializing_if = "crate::core::serde::is_none")]
    pub exit_code: Option<i32>,
}

/// Result of a forceful termination request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOutcome {
    /// The signal was delivered to a live process
    Delivered,
    /// No such process; it had already exited
    AlreadyGone,
}
