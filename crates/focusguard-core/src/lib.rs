//! focusguard core - shared functionality for focusguard tools
//!
//! Standard directories and daemon liveness checks used by the `focus`
//! binary and anything embedding it.

pub mod daemon;
pub mod paths;
pub mod process;

pub use daemon::{DaemonInfo, DaemonStatus};
pub use paths::Paths;
