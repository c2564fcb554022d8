//! Scheduling Policies - Deciding Where Task Groups Run
//!
//! A scheduling policy answers one question under concurrency: which
//! executor receives the next task group. Policies are trait objects so the
//! batch scheduler stays agnostic of the placement strategy; round-robin is
//! the one shipped here.

pub mod round_robin;

pub use round_robin::RoundRobinSchedulingPolicy;

use std::collections::HashSet;

use crate::error::SchedulingError;
use crate::task::{ExecutorId, ScheduledTaskGroup, TaskGroupId};

/// Placement strategy invoked by the batch scheduler.
///
/// All operations appear atomic to each other: implementations guard their
/// state with a single lock, and `attempt_schedule` is the only operation
/// allowed to block.
pub trait SchedulingPolicy: Send + Sync {
    /// Try to find an executor with a free slot for the given task group.
    ///
    /// Blocks up to the configured admission timeout when no slot is free,
    /// retrying exactly once after a wake-up. Returns `Ok(None)` on timeout
    /// or when the wake-up lost the race for the slot; the caller decides
    /// whether to retry. A returned id is a *selection*, not a reservation:
    /// the caller must follow up with [`Self::on_task_group_scheduled`] to
    /// occupy the slot.
    fn attempt_schedule(
        &self,
        stg: &ScheduledTaskGroup,
    ) -> Result<Option<ExecutorId>, SchedulingError>;

    /// An executor joined the fleet; bring it into the rotation.
    fn on_executor_added(&self, executor_id: &str);

    /// An executor left the fleet. Returns the ids of the task groups that
    /// were running on it so the caller can reschedule them.
    fn on_executor_removed(&self, executor_id: &str) -> HashSet<TaskGroupId>;

    /// A selected placement was committed; record the slot occupation.
    fn on_task_group_scheduled(&self, executor_id: &str, stg: &ScheduledTaskGroup);

    /// A task group finished; free its slot and wake one waiter.
    fn on_task_group_execution_complete(&self, executor_id: &str, task_group_id: &str);

    /// A task group failed; free its slot and wake one waiter. Retry or
    /// quarantine decisions stay with the caller.
    fn on_task_group_execution_failed(&self, executor_id: &str, task_group_id: &str);
}
