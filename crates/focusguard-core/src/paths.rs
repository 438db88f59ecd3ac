//! Standard paths used by focusguard tools

use std::path::PathBuf;

/// Standard focusguard paths
pub struct Paths {
    /// Data directory (~/.local/share/focusguard)
    pub data: PathBuf,
    /// Config directory (~/.config/focusguard)
    pub config: PathBuf,
    /// Runtime directory (/run/focusguard or ~/.local/share/focusguard)
    pub runtime: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("focusguard");

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("focusguard");

        // Try /run/focusguard first (NixOS), fall back to data dir
        let runtime = if PathBuf::from("/run/focusguard").exists() {
            PathBuf::from("/run/focusguard")
        } else {
            data.clone()
        };

        Self {
            data,
            config,
            runtime,
        }
    }

    /// Build paths rooted at a single directory (tests, portable installs)
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data: root.join("data"),
            config: root.join("config"),
            runtime: root.join("data"),
        }
    }

    /// Static configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }

    /// Pid file written by a running daemon
    pub fn pid_file(&self, daemon: &str) -> PathBuf {
        self.runtime.join(format!("{}.pid", daemon))
    }

    /// Get state file path for a tool
    pub fn state(&self, file: &str) -> PathBuf {
        self.data.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rooted_paths() {
        let paths = Paths::rooted("/tmp/fg");
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/fg/config/config.json"));
        assert_eq!(paths.pid_file("focusd"), PathBuf::from("/tmp/fg/data/focusd.pid"));
        assert_eq!(paths.state("state.json"), PathBuf::from("/tmp/fg/data/state.json"));
    }
}
