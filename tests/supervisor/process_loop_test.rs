/*!
 * Supervisor Loop Process Tests
 * Full rounds with real worker processes and a SQLite registry file
 */

#![cfg(unix)]

use battle_supervisor::process::{OsSignaller, ProcessSignaller, WorkerSpawner};
use battle_supervisor::registry::{MemoryRegistry, ProcessStatus, RegistryClient, SqliteRegistry};
use battle_supervisor::supervisor::{ErrorSource, RoundPhase};
use battle_supervisor::{LoopSettings, StalenessWindow, SupervisorLoop, WorkerLauncher, WorkerTemplate};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_real_workers_are_registered_and_logged() {
    let dir = TempDir::new().unwrap();
    let log_dir = dir.path().join("logs");
    std::fs::create_dir_all(&log_dir).unwrap();

    let registry = SqliteRegistry::open(dir.path().join("registry.db")).unwrap();
    let launcher = Arc::new(WorkerLauncher::with_supervisor_id(
        WorkerTemplate::new("sleep").with_args(vec!["30".to_string()]),
        31337,
    ));

    let supervisor = SupervisorLoop::new(
        Arc::new(registry.clone()),
        launcher.clone(),
        Arc::new(OsSignaller::new()),
        LoopSettings {
            total_rounds: 3,
            poll_interval: Duration::ZERO,
            window: StalenessWindow::from_secs(360),
            max_running: None,
            log_dir: log_dir.clone(),
        },
    );

    let summary = supervisor.run().await;
    assert_eq!(summary.registered, 3);

    let records = registry.records().unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.status == ProcessStatus::Running));

    for index in 0..3 {
        let log = log_dir.join(format!("instance_{}_supervisor_31337.log", index));
        assert!(log.exists(), "missing {}", log.display());
    }

    let signaller = OsSignaller::new();
    for record in &records {
        signaller.terminate(record.pid).unwrap();
    }
    for _ in 0..250 {
        if launcher.tracked() == 0 {
            break;
        }
        launcher.reap_exited();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(launcher.tracked(), 0);
}

#[tokio::test]
async fn test_missing_log_dir_fails_each_launch_without_stopping() {
    let dir = TempDir::new().unwrap();
    let registry = MemoryRegistry::with_fixed_time(1000);
    let launcher = Arc::new(WorkerLauncher::with_supervisor_id(
        WorkerTemplate::new("true"),
        1,
    ));

    let supervisor = SupervisorLoop::new(
        Arc::new(registry.clone()),
        launcher,
        Arc::new(OsSignaller::new()),
        LoopSettings {
            total_rounds: 2,
            poll_interval: Duration::ZERO,
            window: StalenessWindow::from_secs(360),
            max_running: None,
            log_dir: dir.path().join("missing"),
        },
    );

    let summary = supervisor.run().await;
    assert_eq!(summary.rounds_completed, 2);
    assert_eq!(summary.launch_failures, 2);
    assert!(registry.is_empty());
    for round in &summary.rounds {
        assert_eq!(round.errors[0].phase, RoundPhase::Launching);
        assert_eq!(round.errors[0].source, ErrorSource::Launch);
        assert!(round.errors[0].message.contains("log file"));
    }
}
