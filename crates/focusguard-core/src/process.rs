//! Process management utilities

use sysinfo::{Pid, ProcessesToUpdate, System};

/// Check if a process with the given pid is alive
pub fn is_pid_alive(pid: u32) -> bool {
    let mut sys = System::new();
    let pid = Pid::from_u32(pid);
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid).is_some()
}

/// Pid of the current process
pub fn current_pid() -> u32 {
    std::process::id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_process_is_alive() {
        assert!(is_pid_alive(current_pid()));
    }
}
