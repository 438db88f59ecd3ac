//! Static blocker configuration
//!
//! Loaded once at start from `~/.config/focusguard/config.json`. A missing
//! file yields the defaults below. Invalid values are rejected at load time
//! rather than silently producing a schedule that never (or always) matches.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{BlockerError, Result};
use crate::schedule::Schedule;

/// Blocker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockerConfig {
    /// Weekly blocking window
    #[serde(default)]
    pub schedule: Schedule,

    /// Bare domain names to block, in rule order
    #[serde(default = "default_blocked_sites")]
    pub blocked_sites: Vec<String>,

    /// Redirect target for blocked navigations. Defaults to the rendered
    /// blocked page in the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_page_url: Option<String>,
}

fn default_blocked_sites() -> Vec<String> {
    vec![
        "reddit.com".to_string(),
        "linkedin.com".to_string(),
        "instagram.com".to_string(),
    ]
}

impl Default for BlockerConfig {
    fn default() -> Self {
        Self {
            schedule: Schedule::default(),
            blocked_sites: default_blocked_sites(),
            blocked_page_url: None,
        }
    }
}

fn domain_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$")
            .expect("domain pattern is valid")
    })
}

impl BlockerConfig {
    /// Load and validate configuration, falling back to defaults if the file is missing
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Write configuration, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.schedule.validate()?;

        for site in &self.blocked_sites {
            if !domain_pattern().is_match(site) {
                return Err(BlockerError::InvalidConfig(format!(
                    "blocked site '{}' must be a bare lowercase domain name (no scheme or path)",
                    site
                )));
            }
            if site.starts_with("www.") {
                return Err(BlockerError::InvalidConfig(format!(
                    "blocked site '{}' should omit the www. prefix; both forms are blocked",
                    site
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = self.blocked_sites.iter().find(|s| !seen.insert(s.as_str())) {
            return Err(BlockerError::InvalidConfig(format!(
                "blocked site '{}' listed more than once",
                dup
            )));
        }

        Ok(())
    }
}
