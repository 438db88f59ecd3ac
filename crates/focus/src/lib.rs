//! focus - scheduled site blocking with a one-way manual focus override
//!
//! Blocking is active while the local weekday/hour falls inside a weekly
//! schedule, or while a manual focus session is pending. Sessions last one
//! hour and cannot be stopped early. The coordinator keeps a declarative
//! redirect rule set in step with that decision:
//! - schedule: static weekly window (days + `[start, end)` hours)
//! - rules: two redirect rules per blocked site, fixed id range
//! - store: rule store and state store ports, file-backed by default
//! - coordinator: decision, reconciliation, restore, status
//! - ticker: one-minute reconciliation loop
//!
//! Commands:
//! - daemon: restore state, then reconcile every minute
//! - start: start a one-hour manual focus session
//! - status: show blocking status
//! - sync / install: reconcile once
//! - rules / page: inspect the installed rules and the blocked page

pub mod clock;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod error;
pub mod rules;
pub mod schedule;
pub mod session;
pub mod store;
pub mod ticker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::BlockerConfig;
pub use coordinator::{BlockingPhase, Coordinator, Status, SyncOutcome};
pub use error::BlockerError;
pub use rules::Rule;
pub use schedule::Schedule;
pub use session::ManualFocusSession;
pub use store::{FileRuleStore, FileStateStore, RuleStore, StateStore};
