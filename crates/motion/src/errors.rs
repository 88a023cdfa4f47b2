//! Error types for the motion planning crate.

use thiserror::Error;

/// Errors that can occur while planning or executing motion.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlannerError {
    /// The move queue is full; the caller should back off and retry.
    #[error("move queue is full (capacity reached)")]
    QueueFull,
    /// The periodic tick timer could not be installed.
    #[error("motion timer failed to install")]
    TimerInitFailed,
}
