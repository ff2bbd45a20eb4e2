//! Rename/move detection across scans.
//!
//! A deletion is parked as a [`PendingMove`] under a [`MoveKey`]; a creation
//! with the same key inside the move window is treated as a move of the
//! parked record instead of a new file. Unmatched deletions expire silently.

mod config;
mod tracker;

pub use config::MoveTrackerConfig;
pub use tracker::{MoveCandidate, MoveKey, MoveStatistics, MoveTracker, PendingMove};
