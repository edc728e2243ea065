/*!
 * Supervisor Configuration
 *
 * Command line flags, each with an environment variable fallback, validated
 * into a `SupervisorConfig` before any subsystem starts.
 */

use super::errors::{ConfigError, ConfigResult};
use super::types::StalenessWindow;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default command line of one worker instance
pub const DEFAULT_WORKER_COMMAND: &str = "java -Xmx512m -classpath {classpath} BattleRunner";

/// Default classpath substituted into `{classpath}`
pub const DEFAULT_WORKER_CLASSPATH: &str = "./:libs/*";

/// Placeholder replaced by the configured classpath
pub const CLASSPATH_PLACEHOLDER: &str = "{classpath}";

/// Registry storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryBackend {
    /// SQLite database file
    Sqlite,
    /// Process-local registry, lost on exit
    Memory,
}

/// battle supervisor - launches battle workers and reclaims stale ones
#[derive(Parser, Debug, Clone)]
#[command(name = "supervisor")]
#[command(version, about, long_about = None)]
pub struct SupervisorArgs {
    /// Number of rounds to run before exiting
    #[arg(long, env = "SUPERVISOR_ROUNDS", default_value_t = 30)]
    pub rounds: u32,

    /// Seconds to idle between rounds
    #[arg(long, env = "SUPERVISOR_POLL_INTERVAL_SECS", default_value_t = 180)]
    pub poll_interval_secs: u64,

    /// Staleness window expressed in poll intervals
    #[arg(long, env = "SUPERVISOR_WINDOW_MULTIPLIER", default_value_t = 2)]
    pub window_multiplier: u32,

    /// Skip launching while this many records are still running
    #[arg(long, env = "SUPERVISOR_MAX_RUNNING")]
    pub max_running: Option<u64>,

    /// Registry backend
    #[arg(long, env = "SUPERVISOR_REGISTRY", value_enum, default_value_t = RegistryBackend::Sqlite)]
    pub registry: RegistryBackend,

    /// Path of the SQLite registry file
    #[arg(long, env = "SUPERVISOR_REGISTRY_PATH", default_value = "registry.db")]
    pub registry_path: PathBuf,

    /// Worker command line; `{classpath}` is replaced by --worker-classpath
    #[arg(long, env = "SUPERVISOR_WORKER_COMMAND", default_value = DEFAULT_WORKER_COMMAND)]
    pub worker_command: String,

    /// Classpath handed to the worker command
    #[arg(long, env = "SUPERVISOR_WORKER_CLASSPATH", default_value = DEFAULT_WORKER_CLASSPATH)]
    pub worker_classpath: String,

    /// Working directory of launched workers
    #[arg(long, env = "SUPERVISOR_WORKER_DIR")]
    pub worker_dir: Option<PathBuf>,

    /// Directory receiving per-instance worker logs
    #[arg(long, env = "SUPERVISOR_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Emit supervisor logs as JSON
    #[arg(long, env = "SUPERVISOR_TRACE_JSON")]
    pub log_json: bool,
}

/// Program, arguments and environment of one worker instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkerTemplate {
    pub program: String,
    #[serde(skip_serializing_if = "crate::core::serde::is_empty_vec")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "crate::core::serde::is_empty_vec")]
    pub env_vars: Vec<(String, String)>,
    #[serde(skip_serializing_if = "crate::core::serde::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl WorkerTemplate {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            env_vars: vec![],
            working_dir: None,
        }
    }

    /// Split a command line on whitespace, substituting `{classpath}`
    pub fn parse(command: &str, classpath: &str) -> ConfigResult<Self> {
        let mut parts = command
            .split_whitespace()
            .map(|part| part.replace(CLASSPATH_PLACEHOLDER, classpath));

        let program = parts.next().ok_or_else(|| ConfigError::InvalidValue {
            field: "worker_command",
            reason: "command is empty".to_string(),
        })?;

        Ok(Self::new(program).with_args(parts.collect()))
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_env(mut self, env_vars: Vec<(String, String)>) -> Self {
        self.env_vars = env_vars;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Command line as it would be typed, for logging
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Validated supervisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SupervisorConfig {
    pub total_rounds: u32,
    pub poll_interval: Duration,
    pub window_multiplier: u32,
    #[serde(skip_serializing_if = "crate::core::serde::is_none")]
    pub max_running: Option<u64>,
    pub registry: RegistryBackend,
    pub registry_path: PathBuf,
    pub worker: WorkerTemplate,
    pub log_dir: PathBuf,
    #[serde(skip_serializing_if = "crate::core::serde::is_false")]
    pub log_json: bool,
}

impl SupervisorConfig {
    /// Validate parsed arguments
    pub fn from_args(args: SupervisorArgs) -> ConfigResult<Self> {
        if args.rounds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rounds",
                reason: "must be at least 1".to_string(),
            });
        }

        if args.window_multiplier == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window_multiplier",
                reason: "must be at least 1".to_string(),
            });
        }

        if args.max_running == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_running",
                reason: "must be at least 1 when set".to_string(),
            });
        }

        let mut worker = WorkerTemplate::parse(&args.worker_command, &args.worker_classpath)?;
        if let Some(dir) = args.worker_dir {
            worker = worker.with_working_dir(dir);
        }

        Ok(Self {
            total_rounds: args.rounds,
            poll_interval: Duration::from_secs(args.poll_interval_secs),
            window_multiplier: args.window_multiplier,
            max_running: args.max_running,
            registry: args.registry,
            registry_path: args.registry_path,
            worker,
            log_dir: args.log_dir,
            log_json: args.log_json,
        })
    }

    /// Staleness window derived from the poll interval
    pub fn staleness_window(&self) -> StalenessWindow {
        StalenessWindow::from_poll_interval(self.poll_interval, self.window_multiplier)
    }

    /// Create the log directory if missing
    pub fn ensure_log_dir(&self) -> ConfigResult<()> {
        std::fs::create_dir_all(&self.log_dir).map_err(|e| ConfigError::LogDirectory {
            path: self.log_dir.display().to_string(),
            reason: e.to_string(),
        })
    }
}
