/*!
 * Supervisor Loop
 *
 * Drives a bounded number of rounds. Each round moves through
 * Launching → Registering → Reclaiming → Idling:
 *
 * - **Launching**: start one worker (skipped while at `max_running`)
 * - **Registering**: insert a running record stamped with registry time
 * - **Reclaiming**: one staleness pass over the registry
 * - **Idling**: reap exited children and mark their records reclaimed,
 *   then sleep for the poll interval
 *
 * Reaping frees a pid for reuse, so the record of a reaped worker is closed
 * in the same step. A later worker handed the same pid is never mistaken
 * for the stale one.
 *
 * A launch or registry failure ends the round early (straight to Idling).
 * No failure ever ends the loop.
 */

mod types;

pub use types::{ErrorSource, LoopSettings, RoundError, RoundOutcome, RoundPhase, RunSummary};

use crate::core::errors::SignalError;
use crate::core::types::Pid;
use crate::process::{LaunchedWorker, ProcessSignaller, WorkerSpawner};
use crate::reclaim::StalenessReclaimer;
use crate::registry::RegistryClient;
use std::future::{pending, Future};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

/// Launch–register–reclaim–idle loop
pub struct SupervisorLoop {
    registry: Arc<dyn RegistryClient>,
    spawner: Arc<dyn WorkerSpawner>,
    signaller: Arc<dyn ProcessSignaller>,
    reclaimer: StalenessReclaimer,
    settings: LoopSettings,
    run_id: Uuid,
}

impl SupervisorLoop {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        spawner: Arc<dyn WorkerSpawner>,
        signaller: Arc<dyn ProcessSignaller>,
        settings: LoopSettings,
    ) -> Self {
        let reclaimer = StalenessReclaimer::new(Arc::clone(&registry), Arc::clone(&signaller));
        Self {
            registry,
            spawner,
            signaller,
            reclaimer,
            settings,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Run every configured round
    pub async fn run(&self) -> RunSummary {
        self.run_until(pending::<()>()).await
    }

    /// Run every configured round, stopping early if `shutdown` resolves while idling
    pub async fn run_until<F>(&self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let total = self.settings.total_rounds;
        let mut summary = RunSummary::default();

        info!(
            run_id = %self.run_id,
            rounds = total,
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            window_secs = self.settings.window.as_secs(),
            "Supervisor loop starting"
        );

        for index in 0..total {
            let outcome = self.run_round(index);
            summary.record(outcome);

            if index + 1 == total {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                _ = &mut shutdown => {
                    info!(completed = summary.rounds_completed, "Shutdown requested, stopping before next round");
                    summary.interrupted = true;
                    break;
                }
            }
        }

        info!(
            run_id = %self.run_id,
            rounds = summary.rounds_completed,
            launched = summary.launched,
            registered = summary.registered,
            reclaimed = summary.reclaimed,
            launch_failures = summary.launch_failures,
            store_failures = summary.store_failures,
            "Supervisor loop finished"
        );

        summary
    }

    /// Execute one round without the idle sleep
    pub fn run_round(&self, index: u32) -> RoundOutcome {
        let span = info_span!("round", round = index, run_id = %self.run_id);
        let _entered = span.enter();

        let mut outcome = RoundOutcome::new(index);

        if self.at_capacity(&mut outcome) {
            outcome.launch_skipped = true;
        } else {
            let Some(worker) = self.launch(index, &mut outcome) else {
                self.idle(&mut outcome);
                return outcome;
            };
            if !self.register(worker, &mut outcome) {
                self.idle(&mut outcome);
                return outcome;
            }
        }

        self.reclaim(&mut outcome);
        self.idle(&mut outcome);
        outcome
    }

    /// Whether the running-record count has reached `max_running`
    fn at_capacity(&self, outcome: &mut RoundOutcome) -> bool {
        let Some(max) = self.settings.max_running else {
            return false;
        };

        match self.registry.count_running() {
            Ok(running) if running >= max => {
                info!(running, max, "At target instance count, skipping launch");
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "Could not count running workers, launching anyway");
                outcome.fail(RoundPhase::Launching, ErrorSource::Store, &e);
                false
            }
        }
    }

    fn launch(&self, index: u32, outcome: &mut RoundOutcome) -> Option<LaunchedWorker> {
        debug!(phase = ?RoundPhase::Launching, "Launching worker");
        match self.spawner.launch(index, &self.settings.log_dir) {
            Ok(worker) => {
                outcome.launched = Some(worker.clone());
                Some(worker)
            }
            Err(e) => {
                error!(error = %e, "Worker launch failed, skipping round");
                outcome.fail(RoundPhase::Launching, ErrorSource::Launch, &e);
                None
            }
        }
    }

    fn register(&self, worker: LaunchedWorker, outcome: &mut RoundOutcome) -> bool {
        debug!(phase = ?RoundPhase::Registering, pid = worker.pid, "Registering worker");
        let inserted = self
            .registry
            .now()
            .and_then(|now| self.registry.insert_running(worker.pid, now));

        match inserted {
            Ok(id) => {
                info!(pid = worker.pid, record_id = id, "Worker registered");
                outcome.record_id = Some(id);
                true
            }
            Err(e) => {
                error!(pid = worker.pid, error = %e, "Failed to register worker, terminating it");
                outcome.fail(RoundPhase::Registering, ErrorSource::Store, &e);
                if let Err(e) = self.terminate_unregistered(worker.pid) {
                    outcome.fail(RoundPhase::Registering, ErrorSource::Signal, &e);
                }
                false
            }
        }
    }

    /// A worker without a record would never be reclaimed
    fn terminate_unregistered(&self, pid: Pid) -> Result<(), SignalError> {
        self.signaller.terminate(pid).map(|_| ()).map_err(|e| {
            warn!(pid, error = %e, "Failed to terminate unregistered worker");
            e
        })
    }

    fn reclaim(&self, outcome: &mut RoundOutcome) {
        debug!(phase = ?RoundPhase::Reclaiming, "Reclaiming stale workers");
        match self.reclaimer.reclaim(self.settings.window) {
            Ok(report) => outcome.reclaim = Some(report),
            Err(e) => {
                error!(error = %e, "Reclamation pass failed");
                outcome.fail(RoundPhase::Reclaiming, ErrorSource::Store, &e);
            }
        }
    }

    fn idle(&self, outcome: &mut RoundOutcome) {
        let exited = self.spawner.reap_exited();
        outcome.reaped = exited.len();

        for worker in exited {
            match self.registry.mark_reclaimed(worker.pid) {
                Ok(changed) => {
                    outcome.released += changed as usize;
                    debug!(
                        pid = worker.pid,
                        exit_code = ?worker.exit_code,
                        changed,
                        "Exited worker released"
                    );
                }
                Err(e) => {
                    error!(pid = worker.pid, error = %e, "Failed to release exited worker");
                    outcome.fail(RoundPhase::Idling, ErrorSource::Store, &e);
                }
            }
        }

        debug!(
            phase = ?RoundPhase::Idling,
            reaped = outcome.reaped,
            released = outcome.released,
            tracked = self.spawner.tracked(),
            "Round complete"
        );
    }
}
