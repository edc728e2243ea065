/*!
 * Battle Supervisor - Main Entry Point
 *
 * Launches one battle worker per round, records it in the process registry
 * and reclaims workers that outlive the staleness window.
 */

use battle_supervisor::{
    init_tracing, registry, OsSignaller, SupervisorArgs, SupervisorConfig, SupervisorError,
    SupervisorLoop, WorkerLauncher,
};
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = SupervisorArgs::parse();
    init_tracing(args.log_json);

    let config = SupervisorConfig::from_args(args).map_err(SupervisorError::from)?;
    // Launches report a missing log directory per round
    if let Err(e) = config.ensure_log_dir() {
        warn!(error = %e, "Log directory unavailable");
    }

    info!("Battle supervisor starting...");
    info!(
        config = %serde_json::to_string(&config).unwrap_or_default(),
        "Configuration loaded"
    );

    // Registry errors past this point are recoverable per round
    let registry = registry::open(&config).map_err(SupervisorError::from)?;

    let launcher = WorkerLauncher::new(config.worker.clone());
    let supervisor = SupervisorLoop::new(
        registry,
        Arc::new(launcher),
        Arc::new(OsSignaller::new()),
        (&config).into(),
    );

    info!(
        run_id = %supervisor.run_id(),
        "Press Ctrl+C to stop after the current round"
    );

    let summary = supervisor
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Could not listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!(
        rounds = summary.rounds_completed,
        registered = summary.registered,
        reclaimed = summary.reclaimed,
        interrupted = summary.interrupted,
        "Battle supervisor exiting"
    );
    debug!(
        summary = %serde_json::to_string(&summary).unwrap_or_default(),
        "Run summary"
    );

    Ok(())
}
