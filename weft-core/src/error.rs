//! Scheduling Errors
//!
//! Typed failures surfaced by the scheduling core. Anything the policy can
//! report to its caller is a [`SchedulingError`]; orchestration layers wrap
//! these in `anyhow` at the binary boundary.

use thiserror::Error;

use crate::task::ExecutorId;

/// Errors surfaced by the scheduling policy and its configuration.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// The global scheduler mutex (or one of its condition variables) was
    /// poisoned by a panicking thread. Carries the operation that observed
    /// the poison; the panic itself is the original cause.
    #[error("scheduler lock poisoned during {0}")]
    LockPoisoned(&'static str),

    /// An operation referenced an executor id missing from the cached
    /// representer map. Indicates a logic bug in the surrounding scheduler:
    /// lifecycle callbacks must only name executors the container manager
    /// has reported.
    #[error("unknown executor id: {0}")]
    UnknownExecutor(ExecutorId),

    /// Configuration failed validation.
    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(String),
}
