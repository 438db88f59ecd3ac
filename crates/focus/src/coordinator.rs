//! Blocking coordinator
//!
//! Decides whether blocking should be active right now (schedule OR manual
//! focus) and reconciles the rule store to that decision. Every trigger,
//! whether a periodic tick, process start, install, or the start-focus
//! command, goes through [`Coordinator::synchronize_rules`].
//!
//! The rule store only ever sees a full replace of the owned id range or a
//! full clear of it, so running a reconciliation twice, or two of them
//! interleaved, always ends in a state some single reconciliation produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::BlockerConfig;
use crate::error::Result;
use crate::rules::{generate_rules, rule_ids};
use crate::session::ManualFocusSession;
use crate::store::{RuleStore, StateStore};

/// Which blocking sources are currently in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockingPhase {
    Inactive,
    ScheduledOnly,
    ManualOnly,
    Both,
}

impl BlockingPhase {
    pub fn from_flags(scheduled: bool, manual: bool) -> Self {
        match (scheduled, manual) {
            (false, false) => Self::Inactive,
            (true, false) => Self::ScheduledOnly,
            (false, true) => Self::ManualOnly,
            (true, true) => Self::Both,
        }
    }

    pub fn is_blocking(&self) -> bool {
        !matches!(self, Self::Inactive)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::ScheduledOnly => "scheduled",
            Self::ManualOnly => "manual focus",
            Self::Both => "scheduled + manual focus",
        }
    }
}

impl std::fmt::Display for BlockingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only status projection, computed fresh on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub is_scheduled_blocking: bool,
    pub is_manual_focus: bool,
    /// End of the pending manual focus session (epoch millis)
    pub manual_focus_end_time: Option<i64>,
    pub should_block: bool,
}

impl Status {
    pub fn phase(&self) -> BlockingPhase {
        BlockingPhase::from_flags(self.is_scheduled_blocking, self.is_manual_focus)
    }

    pub fn manual_focus_session(&self) -> Option<ManualFocusSession> {
        self.manual_focus_end_time.map(ManualFocusSession::from_millis)
    }
}

/// Result of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The full rule set is installed
    Blocking { rules: usize },
    /// The owned id range is empty
    Cleared,
    /// Reconciliation failed; a fail-open clear was attempted
    FailedOpen { error: String, cleared: bool },
}

impl SyncOutcome {
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Blocking { .. })
    }
}

/// Owns the blocking decision and the reconciliation against the rule store
pub struct Coordinator<R, S, C = SystemClock> {
    config: BlockerConfig,
    blocked_page_url: String,
    rules: R,
    state: S,
    clock: C,
}

impl<R: RuleStore, S: StateStore> Coordinator<R, S, SystemClock> {
    /// Coordinator on the system clock
    pub fn new(config: BlockerConfig, blocked_page_url: String, rules: R, state: S) -> Self {
        Self::with_clock(config, blocked_page_url, rules, state, SystemClock)
    }
}

impl<R: RuleStore, S: StateStore, C: Clock> Coordinator<R, S, C> {
    pub fn with_clock(
        config: BlockerConfig,
        blocked_page_url: String,
        rules: R,
        state: S,
        clock: C,
    ) -> Self {
        Self {
            config,
            blocked_page_url,
            rules,
            state,
            clock,
        }
    }

    pub fn config(&self) -> &BlockerConfig {
        &self.config
    }

    pub fn blocked_page_url(&self) -> &str {
        &self.blocked_page_url
    }

    pub fn rule_store(&self) -> &R {
        &self.rules
    }

    pub fn state_store(&self) -> &S {
        &self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Ids owned by this blocker
    fn owned_ids(&self) -> Vec<u32> {
        rule_ids(self.config.blocked_sites.len())
    }

    /// Whether the current local weekday/hour is inside the schedule
    pub fn is_scheduled_blocking_time(&self) -> bool {
        self.config.schedule.is_active_at(&self.clock.now())
    }

    /// The pending manual focus session, removing it if it has expired
    async fn manual_focus_session(&self) -> Result<Option<ManualFocusSession>> {
        let Some(end_time) = self.state.manual_focus_end().await? else {
            return Ok(None);
        };

        let session = ManualFocusSession::from_millis(end_time);
        if session.is_active_at(self.clock.now_utc()) {
            return Ok(Some(session));
        }

        info!(end_time, "Manual focus session expired");
        if let Err(e) = self.state.remove_manual_focus(end_time).await {
            // Still expired; removal is retried on the next evaluation
            warn!("Failed to remove expired focus session: {}", e);
        }
        Ok(None)
    }

    /// Whether a manual focus session is in force. Expired sessions are
    /// removed here and nowhere else.
    pub async fn is_manual_focus_active(&self) -> Result<bool> {
        Ok(self.manual_focus_session().await?.is_some())
    }

    /// Scheduled blocking OR manual focus
    pub async fn should_block_now(&self) -> Result<bool> {
        let scheduled = self.is_scheduled_blocking_time();
        match self.is_manual_focus_active().await {
            Ok(manual) => Ok(scheduled || manual),
            Err(e) if scheduled => {
                warn!("Could not read focus session, schedule alone decides: {}", e);
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    async fn apply_decision(&self, ids: &[u32]) -> Result<bool> {
        if self.should_block_now().await? {
            let rules = generate_rules(&self.config.blocked_sites, &self.blocked_page_url);
            self.rules.update(ids, rules).await?;
            Ok(true)
        } else {
            self.rules.clear(ids).await?;
            Ok(false)
        }
    }

    async fn record_blocking_active(&self, active: bool) {
        let previous = self.state.blocking_active().await.ok();
        if let Err(e) = self.state.set_blocking_active(active).await {
            warn!("Failed to persist blocking state: {}", e);
        }
        match previous {
            Some(prev) if prev == active => {
                debug!(active, "Blocking state unchanged")
            }
            _ if active => info!(at = %self.clock.now(), "Blocking rules enabled"),
            _ => info!(at = %self.clock.now(), "Blocking rules disabled"),
        }
    }

    /// Reconcile the rule store with the current decision.
    ///
    /// Never fails: if the decision or the rule update fails, a best-effort
    /// clear of the owned range is attempted so a broken state fails open,
    /// and the next tick retries the whole reconciliation.
    pub async fn synchronize_rules(&self) -> SyncOutcome {
        let ids = self.owned_ids();

        match self.apply_decision(&ids).await {
            Ok(active) => {
                self.record_blocking_active(active).await;
                if active {
                    SyncOutcome::Blocking { rules: ids.len() }
                } else {
                    SyncOutcome::Cleared
                }
            }
            Err(e) => {
                warn!("Rule reconciliation failed, clearing rules: {}", e);
                let cleared = match self.rules.clear(&ids).await {
                    Ok(()) => {
                        self.record_blocking_active(false).await;
                        true
                    }
                    Err(clear_err) => {
                        error!("Fail-open clear also failed: {}", clear_err);
                        false
                    }
                };
                SyncOutcome::FailedOpen {
                    error: e.to_string(),
                    cleared,
                }
            }
        }
    }

    /// Start a one-hour manual focus session and reconcile immediately.
    ///
    /// There is no matching stop. If a session is already pending, the later
    /// of the two end times is kept, so starting again never shortens one.
    /// Persistence failures are returned and leave the stored session as it was.
    pub async fn start_focus_mode(&self) -> Result<DateTime<Utc>> {
        let now = self.clock.now_utc();
        let mut session = ManualFocusSession::starting_at(now);
        if let Some(existing) = self.manual_focus_session().await? {
            session = session.later(existing);
        }

        self.state.set_manual_focus_end(session.end_time).await?;
        info!(end = %session.end(), "Manual focus started");

        self.synchronize_rules().await;
        Ok(session.end())
    }

    /// Reconcile once at process start, regardless of what the stores hold.
    ///
    /// Also drops rules outside the owned range, left over from a longer
    /// site list in an earlier configuration.
    pub async fn restore_state(&self) -> SyncOutcome {
        let owned = self.owned_ids();
        match self.rules.list().await {
            Ok(existing) => {
                let leftover: Vec<u32> = existing
                    .iter()
                    .map(|r| r.id)
                    .filter(|id| !owned.contains(id))
                    .collect();
                if !leftover.is_empty() {
                    info!(count = leftover.len(), "Removing rules outside the owned id range");
                    if let Err(e) = self.rules.clear(&leftover).await {
                        warn!("Failed to remove leftover rules: {}", e);
                    }
                }
            }
            Err(e) => warn!("Could not list installed rules: {}", e),
        }

        let outcome = self.synchronize_rules().await;
        info!(?outcome, "State restored");
        outcome
    }

    /// Fresh status for display surfaces
    pub async fn status(&self) -> Result<Status> {
        let is_scheduled_blocking = self.is_scheduled_blocking_time();
        let session = self.manual_focus_session().await?;
        let is_manual_focus = session.is_some();

        Ok(Status {
            is_scheduled_blocking,
            is_manual_focus,
            manual_focus_end_time: session.map(|s| s.end_time),
            should_block: is_scheduled_blocking || is_manual_focus,
        })
    }
}
