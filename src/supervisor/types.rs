/*!
 * Supervisor Types
 * Round phases, per-round outcomes and run summaries
 */

use crate::core::config::SupervisorConfig;
use crate::core::serde::{is_empty_vec, is_false, is_none};
use crate::core::types::{RecordId, StalenessWindow};
use crate::process::LaunchedWorker;
use crate::reclaim::ReclaimReport;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

/// Phase of a supervisor round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Launching,
    Registering,
    Reclaiming,
    Idling,
}

/// Loop parameters
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub total_rounds: u32,
    pub poll_interval: Duration,
    pub window: StalenessWindow,
    /// Target concurrent instance count; independent of `total_rounds`
    pub max_running: Option<u64>,
    pub log_dir: PathBuf,
}

impl From<&SupervisorConfig> for LoopSettings {
    fn from(config: &SupervisorConfig) -> Self {
        Self {
            total_rounds: config.total_rounds,
            poll_interval: config.poll_interval,
            window: config.staleness_window(),
            max_running: config.max_running,
            log_dir: config.log_dir.clone(),
        }
    }
}

/// Subsystem a swallowed failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSource {
    Launch,
    Store,
    Signal,
}

/// A failure swallowed inside a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoundError {
    pub phase: RoundPhase,
    pub source: ErrorSource,
    pub message: String,
}

/// What one round did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoundOutcome {
    pub index: u32,
    #[serde(skip_serializing_if = "is_none")]
    pub launched: Option<LaunchedWorker>,
    #[serde(skip_serializing_if = "is_none")]
    pub record_id: Option<RecordId>,
    /// Launch skipped because the target instance count was reached
    #[serde(skip_serializing_if = "is_false", default)]
    pub launch_skipped: bool,
    #[serde(skip_serializing_if = "is_none")]
    pub reclaim: Option<ReclaimReport>,
    /// Exited children collected while idling
    pub reaped: usize,
    /// Records of reaped children marked reclaimed
    #[serde(default)]
    pub released: usize,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub errors: Vec<RoundError>,
}

impl RoundOutcome {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            launched: None,
            record_id: None,
            launch_skipped: false,
            reclaim: None,
            reaped: 0,
            released: 0,
            errors: Vec::new(),
        }
    }

    pub(crate) fn fail(&mut self, phase: RoundPhase, source: ErrorSource, err: &impl Display) {
        self.errors.push(RoundError {
            phase,
            source,
            message: err.to_string(),
        });
    }

    /// No swallowed errors and no reclamation failures
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.reclaim.as_ref().map_or(true, ReclaimReport::is_clean)
    }
}

/// Totals over a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunSummary {
    pub rounds_completed: u32,
    pub launched: u32,
    pub registered: u32,
    pub launch_failures: u32,
    pub store_failures: u32,
    pub reclaimed: usize,
    pub reclaim_failures: usize,
    pub released: usize,
    #[serde(skip_serializing_if = "is_false", default)]
    pub interrupted: bool,
    pub rounds: Vec<RoundOutcome>,
}

impl RunSummary {
    pub(crate) fn record(&mut self, outcome: RoundOutcome) {
        self.rounds_completed += 1;
        if outcome.launched.is_some() {
            self.launched += 1;
        }
        if outcome.record_id.is_some() {
            self.registered += 1;
        }
        for err in &outcome.errors {
            match err.source {
                ErrorSource::Launch => self.launch_failures += 1,
                ErrorSource::Store => self.store_failures += 1,
                ErrorSource::Signal => {}
            }
        }
        self.released += outcome.released;
        if let Some(ref report) = outcome.reclaim {
            self.reclaimed += report.reclaimed;
            self.reclaim_failures += report.failures.len();
        }
        self.rounds.push(outcome);
    }
}
