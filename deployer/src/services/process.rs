//! OS process supervision by command-line matching
//!
//! Nothing is remembered between calls: every query re-reads the process
//! table. The supervisor's own process never counts as a match, and neither
//! do zombies left behind by a service that already died.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

use regex::Regex;
use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::DeployError;
use crate::storage::settings::ServiceSettings;

/// A command to start or stop something
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Command line interpreted by `sh -c`
    Shell(String),

    /// Executable run directly, its path never goes through a shell
    Program(PathBuf),
}

impl Invocation {
    /// Run the command and wait for it
    pub async fn run(&self) -> Result<ExitStatus, DeployError> {
        match self {
            Invocation::Shell(command) => run_shell(command).await,
            Invocation::Program(path) => {
                debug!("Running: {}", path.display());
                Command::new(path).status().await.map_err(|e| {
                    DeployError::ServiceError(format!("Failed to run '{}': {}", path.display(), e))
                })
            }
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Shell(command) => write!(f, "{}", command),
            Invocation::Program(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<&str> for Invocation {
    fn from(command: &str) -> Self {
        Invocation::Shell(command.to_string())
    }
}

impl From<String> for Invocation {
    fn from(command: String) -> Self {
        Invocation::Shell(command)
    }
}

impl From<PathBuf> for Invocation {
    fn from(path: PathBuf) -> Self {
        Invocation::Program(path)
    }
}

/// A service identified by a command-line pattern
#[derive(Debug, Clone)]
pub struct SupervisedProcess {
    pub name: String,
    pub pattern: Regex,
    pub start_command: Option<Invocation>,
    pub stop_command: Option<Invocation>,
}

impl SupervisedProcess {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, DeployError> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            start_command: None,
            stop_command: None,
        })
    }

    pub fn with_start_command(mut self, command: impl Into<Invocation>) -> Self {
        self.start_command = Some(command.into());
        self
    }

    pub fn with_stop_command(mut self, command: impl Into<Invocation>) -> Self {
        self.stop_command = Some(command.into());
        self
    }

    pub fn from_settings(settings: &ServiceSettings) -> Result<Self, DeployError> {
        let mut process = Self::new(&settings.name, &settings.pattern)?;
        process.start_command = settings.start_command.clone().map(Invocation::Shell);
        process.stop_command = settings.stop_command.clone().map(Invocation::Shell);
        Ok(process)
    }

    /// Whether any other process matches this service's pattern
    pub fn is_running(&self) -> bool {
        is_running(&self.pattern)
    }
}

/// Outcome of an ensure call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStatus {
    AlreadyStopped,
    /// Number of processes a kill signal was delivered to
    Stopped(usize),
    AlreadyRunning,
    Started,
}

fn process_table() -> System {
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
    );
    sys
}

/// Full command line, or the bare process name when it is unreadable
fn command_line(process: &Process) -> String {
    let args: Vec<String> = process
        .cmd()
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    if args.is_empty() {
        process.name().to_string_lossy().into_owned()
    } else {
        args.join(" ")
    }
}

fn matching_pids(sys: &System, pattern: &Regex) -> Vec<Pid> {
    let own_pid = sysinfo::get_current_pid().ok();

    let mut pids: Vec<Pid> = sys
        .processes()
        .iter()
        .filter(|(pid, _)| Some(**pid) != own_pid)
        .filter(|(_, process)| process.thread_kind().is_none())
        .filter(|(_, process)| process.status() != sysinfo::ProcessStatus::Zombie)
        .filter(|(_, process)| pattern.is_match(&command_line(process)))
        .map(|(pid, _)| *pid)
        .collect();
    pids.sort();
    pids
}

/// Whether any live process other than this one matches `pattern`
pub fn is_running(pattern: &Regex) -> bool {
    let sys = process_table();
    !matching_pids(&sys, pattern).is_empty()
}

/// Run `command` through `sh -c` and wait for it
pub async fn run_shell(command: &str) -> Result<ExitStatus, DeployError> {
    debug!("Running: {}", command);
    Command::new("sh")
        .args(["-c", command])
        .status()
        .await
        .map_err(|e| DeployError::ServiceError(format!("Failed to run '{}': {}", command, e)))
}

/// Stop `process` if it runs: graceful stop command first, then SIGKILL
///
/// Kills are best effort and not verified.
pub async fn ensure_off(process: &SupervisedProcess) -> Result<ProcessStatus, DeployError> {
    if !process.is_running() {
        info!("{} is not running", process.name);
        return Ok(ProcessStatus::AlreadyStopped);
    }

    info!("Stopping {}", process.name);
    if let Some(stop_command) = &process.stop_command {
        match stop_command.run().await {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("Stop command '{}' for {} exited with {}", stop_command, process.name, status),
            Err(e) => warn!("{}", e),
        }
    }

    let sys = process_table();
    let mut signalled = 0;
    for pid in matching_pids(&sys, &process.pattern) {
        if let Some(proc_) = sys.process(pid) {
            if proc_.kill() {
                debug!("Killed {} (pid {})", process.name, pid);
                signalled += 1;
            } else {
                warn!("Unable to kill {} (pid {})", process.name, pid);
            }
        }
    }

    Ok(ProcessStatus::Stopped(signalled))
}

/// Start `process` with its start command unless it already runs
pub async fn ensure_running(process: &SupervisedProcess) -> Result<ProcessStatus, DeployError> {
    if process.is_running() {
        debug!("{} is already running", process.name);
        return Ok(ProcessStatus::AlreadyRunning);
    }

    let start_command = process.start_command.as_ref().ok_or_else(|| {
        DeployError::ServiceError(format!("{} is not running and has no start command", process.name))
    })?;

    info!("Starting {}", process.name);
    let status = start_command.run().await?;
    if !status.success() {
        return Err(DeployError::ServiceError(format!(
            "Starting {} failed ({})",
            process.name, status
        )));
    }

    Ok(ProcessStatus::Started)
}
