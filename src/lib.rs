/*!
 * Battle Supervisor Library
 * Launches battle workers, tracks them in a shared registry and reclaims
 * the ones that outlive their staleness window
 */

pub mod core;
pub mod monitoring;
pub mod process;
pub mod reclaim;
pub mod registry;
pub mod supervisor;

// Re-exports
pub use crate::core::{
    ConfigError, ConnectionError, LaunchError, SignalError, StalenessWindow, StoreError,
    SupervisorArgs, SupervisorConfig, SupervisorError, WorkerTemplate,
};
pub use monitoring::init_tracing;
pub use process::{OsSignaller, ProcessSignaller, WorkerLauncher, WorkerSpawner};
pub use reclaim::{ReclaimReport, StalenessReclaimer};
pub use registry::{MemoryRegistry, ProcessRecord, ProcessStatus, RegistryClient, SqliteRegistry};
pub use supervisor::{LoopSettings, RoundOutcome, RunSummary, SupervisorLoop};
