/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::Pid;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registry connection errors. Fatal: only raised while opening the registry at startup
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConnectionError {
    #[error("Failed to open registry at {path}: {reason}")]
    #[diagnostic(
        code(registry::open_failed),
        help("Check that the registry path exists and is writable.")
    )]
    OpenFailed { path: String, reason: String },

    #[error("Failed to initialize registry schema: {0}")]
    #[diagnostic(
        code(registry::schema_failed),
        help("The registry file may be corrupt or owned by an incompatible schema.")
    )]
    SchemaFailed(String),
}

/// Registry operation errors. Recoverable: the failing operation is skipped
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum StoreError {
    #[error("Registry query failed: {0}")]
    #[diagnostic(
        code(registry::query_failed),
        help("The operation will be retried in the next round.")
    )]
    QueryFailed(String),

    #[error("Registry returned corrupt data: {0}")]
    #[diagnostic(
        code(registry::corrupt),
        help("A record holds a value outside the known status codes.")
    )]
    Corrupt(String),

    #[error("Registry unavailable: {0}")]
    #[diagnostic(code(registry::unavailable))]
    Unavailable(String),
}

/// Worker launch errors. Recoverable: the round proceeds without a new instance
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LaunchError {
    #[error("Invalid worker command: {0}")]
    #[diagnostic(
        code(launch::invalid_command),
        help("Check --worker-command; shell metacharacters are not allowed.")
    )]
    InvalidCommand(String),

    #[error("Failed to prepare log file {path}: {reason}")]
    #[diagnostic(
        code(launch::log_file),
        help("Check that the log directory exists and is writable.")
    )]
    LogFile { path: String, reason: String },

    #[error("Spawn failed for '{command}': {reason}")]
    #[diagnostic(
        code(launch::spawn_failed),
        help("The OS refused to create the process. Check resources and the worker binary.")
    )]
    SpawnFailed { command: String, reason: String },
}

/// Termination signal errors. A process that is already gone is not an error
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SignalError {
    #[error("Permission denied signalling process {0}")]
    #[diagnostic(
        code(signal::permission_denied),
        help("The pid may have been recycled by a process owned by another user.")
    )]
    PermissionDenied(Pid),

    #[error("Invalid pid {0}")]
    #[diagnostic(code(signal::invalid_pid))]
    InvalidPid(Pid),

    #[error("Failed to signal process {pid}: {reason}")]
    #[diagnostic(code(signal::failed))]
    Failed { pid: Pid, reason: String },

    #[error("Process signalling is not supported on this platform")]
    #[diagnostic(code(signal::unsupported))]
    Unsupported,
}

/// Configuration errors. Fatal at startup
#[derive(Error, Debug, Clone, Serialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(config::invalid_value),
        help("See `supervisor --help` for accepted values and environment variables.")
    )]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to create log directory {path}: {reason}")]
    #[diagnostic(code(config::log_dir))]
    LogDirectory { path: String, reason: String },
}

/// Top-level supervisor error, used for startup failures
#[derive(Error, Debug, Diagnostic)]
pub enum SupervisorError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Connection(#[from] ConnectionError),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type LaunchResult<T> = Result<T, LaunchError>;
pub type SignalResult<T> = Result<T, SignalError>;
pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref code, _)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::QueryFailed(other.to_string()),
        }
    }
}
