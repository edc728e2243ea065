/*!
 * Worker Launcher
 * Handles OS-level spawning and reaping of detached worker processes
 */

use super::traits::WorkerSpawner;
use super::types::{ExitedWorker, LaunchedWorker};
use crate::core::config::WorkerTemplate;
use crate::core::errors::{LaunchError, LaunchResult};
use crate::core::types::Pid;
use dashmap::DashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Environment variable carrying the supervisor identity to the worker
pub const ENV_SUPERVISOR_ID: &str = "SUPERVISOR_ID";

/// Environment variable carrying the instance index to the worker
pub const ENV_INSTANCE_INDEX: &str = "SUPERVISOR_INSTANCE_INDEX";

/// Log file of one instance: `<dir>/instance_<index>_supervisor_<id>.log`
pub fn log_path(log_dir: &Path, instance_index: u32, supervisor_id: u32) -> PathBuf {
    log_dir.join(format!(
        "instance_{}_supervisor_{}.log",
        instance_index, supervisor_id
    ))
}

/// A launched worker that has not been reaped yet
#[derive(Debug)]
struct TrackedWorker {
    instance_index: u32,
    child: Child,
}

/// Launches worker instances and keeps their handles until they exit
pub struct WorkerLauncher {
    template: WorkerTemplate,
    supervisor_id: u32,
    children: Arc<DashMap<Pid, TrackedWorker>>,
}

impl WorkerLauncher {
    /// Launcher identified by the current process id
    pub fn new(template: WorkerTemplate) -> Self {
        Self::with_supervisor_id(template, std::process::id())
    }

    pub fn with_supervisor_id(template: WorkerTemplate, supervisor_id: u32) -> Self {
        info!(
            supervisor_id,
            command = %template.display(),
            "Worker launcher initialized"
        );
        Self {
            template,
            supervisor_id,
            children: Arc::new(DashMap::new()),
        }
    }

    /// Validate the worker program
    fn validate_command(&self) -> LaunchResult<()> {
        let program = &self.template.program;

        if program.trim().is_empty() {
            return Err(LaunchError::InvalidCommand("Empty command".to_string()));
        }

        // Shell injection prevention
        let dangerous_chars = [';', '|', '&', '\n', '\r', '\0', '`', '$', '(', ')'];
        if dangerous_chars.iter().any(|&c| program.contains(c)) {
            return Err(LaunchError::InvalidCommand(format!(
                "'{}' contains shell metacharacters",
                program
            )));
        }

        // Command traversal prevention
        if program.contains("..") {
            return Err(LaunchError::InvalidCommand(format!(
                "'{}' contains path traversal",
                program
            )));
        }

        Ok(())
    }

    fn open_log(&self, path: &Path) -> LaunchResult<(File, File)> {
        let log_err = |e: std::io::Error| LaunchError::LogFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        let stdout = File::create(path).map_err(log_err)?;
        let stderr = stdout.try_clone().map_err(log_err)?;
        Ok((stdout, stderr))
    }

    fn build_command(&self, instance_index: u32, stdout: File, stderr: File) -> Command {
        let mut cmd = Command::new(&self.template.program);
        cmd.args(&self.template.args);

        for (key, value) in &self.template.env_vars {
            cmd.env(key, value);
        }
        cmd.env(ENV_SUPERVISOR_ID, self.supervisor_id.to_string())
            .env(ENV_INSTANCE_INDEX, instance_index.to_string());

        if let Some(ref dir) = self.template.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        // Own process group: terminal signals aimed at the supervisor skip the worker
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd
    }
}

impl WorkerSpawner for WorkerLauncher {
    fn launch(&self, instance_index: u32, log_dir: &Path) -> LaunchResult<LaunchedWorker> {
        self.validate_command()?;

        let log_path = log_path(log_dir, instance_index, self.supervisor_id);
        let (stdout, stderr) = self.open_log(&log_path)?;

        let child = self
            .build_command(instance_index, stdout, stderr)
            .spawn()
            .map_err(|e| LaunchError::SpawnFailed {
                command: self.template.program.clone(),
                reason: e.to_string(),
            })?;

        let pid = child.id();
        info!(
            pid,
            instance = instance_index,
            log_path = %log_path.display(),
            "Spawned worker"
        );

        self.children.insert(
            pid,
            TrackedWorker {
                instance_index,
                child,
            },
        );

        Ok(LaunchedWorker {
            pid,
            instance_index,
            log_path,
        })
    }

    fn reap_exited(&self) -> Vec<ExitedWorker> {
        let mut exited = Vec::new();
        let mut lost = Vec::new();

        for mut entry in self.children.iter_mut() {
            let pid = *entry.key();
            let worker = entry.value_mut();

            match worker.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(pid, code = ?status.code(), "Worker exited");
                    exited.push(ExitedWorker {
                        pid,
                        instance_index: worker.instance_index,
                        exit_code: status.code(),
                    });
                }
                Ok(None) => {
                    // Still running
                }
                Err(e) => {
                    warn!(pid, error = %e, "Error checking worker, no longer tracking it");
                    lost.push(pid);
                }
            }
        }

        for worker in &exited {
            self.children.remove(&worker.pid);
        }
        for pid in lost {
            self.children.remove(&pid);
        }

        if !exited.is_empty() {
            info!(
                reaped = exited.len(),
                remaining = self.children.len(),
                "Reaped exited workers"
            );
        }

        exited
    }

    fn tracked(&self) -> usize {
        self.children.len()
    }
}

impl Clone for WorkerLauncher {
    fn clone(&self) -> Self {
        Self {
            template: self.template.clone(),
            supervisor_id: self.supervisor_id,
            children: Arc::clone(&self.children),
        }
    }
}
