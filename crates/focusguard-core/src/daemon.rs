//! Daemon status checking
//!
//! A daemon records its pid in `<runtime>/<name>.pid` while it runs. Status
//! is derived from whether that file exists and the pid is still alive.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::paths::Paths;
use crate::process;

/// Status of a daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    Running,
    Stopped,
    /// Pid file exists but the process is gone
    Stale,
}

impl DaemonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Stale => "stale",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Running => "●",
            Self::Stopped => "○",
            Self::Stale => "●",
        }
    }
}

/// Information about a daemon
#[derive(Debug, Clone)]
pub struct DaemonInfo {
    pub status: DaemonStatus,
    pub pid: Option<u32>,
}

/// Check the status of the named daemon
pub fn check_daemon(paths: &Paths, name: &str) -> DaemonInfo {
    let pid_path = paths.pid_file(name);
    let pid = fs::read_to_string(&pid_path)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok());

    let status = match pid {
        Some(pid) if process::is_pid_alive(pid) => DaemonStatus::Running,
        Some(_) => DaemonStatus::Stale,
        None => DaemonStatus::Stopped,
    };

    DaemonInfo { status, pid }
}

/// Pid file held for the lifetime of a daemon, removed on drop
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Write the current pid for the named daemon
    pub fn create(paths: &Paths, name: &str) -> Result<Self> {
        let path = paths.pid_file(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create runtime directory: {}", parent.display()))?;
        }
        fs::write(&path, process::current_pid().to_string())
            .with_context(|| format!("Failed to write pid file: {}", path.display()))?;
        Ok(Self { path })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
