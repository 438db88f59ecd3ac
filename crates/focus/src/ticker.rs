//! Periodic reconciliation
//!
//! Restores state once, then reconciles on every tick until shutdown. The
//! tick interval bounds how long a schedule boundary or an expired focus
//! session can go unnoticed.

use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::coordinator::Coordinator;
use crate::store::{RuleStore, StateStore};

/// Default reconciliation interval
pub const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Run until `shutdown` resolves, returning the number of ticks processed
pub async fn run<R, S, C, F>(coordinator: &Coordinator<R, S, C>, every: Duration, shutdown: F) -> u64
where
    R: RuleStore,
    S: StateStore,
    C: Clock,
    F: Future<Output = ()>,
{
    coordinator.restore_state().await;

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick fires immediately and restore_state already covered it
    interval.tick().await;

    tokio::pin!(shutdown);
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(ticks, "Ticker shutting down");
                break;
            }
            _ = interval.tick() => {
                ticks += 1;
                let outcome = coordinator.synchronize_rules().await;
                debug!(ticks, ?outcome, "Tick");
            }
        }
    }

    ticks
}
