//! Executor Representers - Handles to the Worker Fleet
//!
//! Every worker executor process in the cluster is mirrored inside the
//! scheduler by a representer: a handle carrying the executor's container
//! type, its capacity, and the set of task groups currently running on it.
//!
//! # Design Philosophy:
//! - **Trait at the seam**: the scheduling policy only sees the capability
//!   set `{container_type, capacity, running_task_groups, on_scheduled,
//!   on_complete}`, so tests can substitute a deterministic fake
//! - **Blocking primitives**: the running set is guarded by `std::sync`
//!   locks; mutation happens while the policy holds its global mutex
//! - **Capacity is a hard bound**: a free slot exists iff
//!   `running < capacity`

pub mod manager;

pub use manager::{ContainerManager, InMemoryContainerManager};

use std::collections::HashSet;
use std::sync::RwLock;
use tracing::debug;

use crate::task::{ContainerType, ScheduledTaskGroup, TaskGroupId};

/// Scheduler-side handle to a single worker executor.
///
/// Implementations must be thread-safe: the scheduling policy invokes these
/// methods while holding its global lock, but snapshots may also be taken
/// by diagnostics off the scheduling path.
pub trait ExecutorRepresenter: Send + Sync {
    /// The executor's unique id.
    fn executor_id(&self) -> &str;

    /// The executor's container type. Never [`ContainerType::Any`].
    fn container_type(&self) -> ContainerType;

    /// Maximum number of task groups this executor runs concurrently.
    fn capacity(&self) -> usize;

    /// Snapshot of the task group ids currently running on this executor.
    fn running_task_groups(&self) -> HashSet<TaskGroupId>;

    /// Record that a task group now occupies one of this executor's slots.
    fn on_task_group_scheduled(&self, stg: &ScheduledTaskGroup);

    /// Record that a task group finished and its slot is free again.
    fn on_task_group_execution_complete(&self, task_group_id: &str);

    /// Returns `true` if at least one slot is unoccupied.
    fn has_free_slot(&self) -> bool {
        self.running_task_groups().len() < self.capacity()
    }
}

/// Production representer backed by an in-process running set.
///
/// The container manager creates one of these per discovered executor and
/// hands it to the scheduler through the representer map snapshot.
pub struct DefaultExecutorRepresenter {
    executor_id: String,
    container_type: ContainerType,
    capacity: usize,
    running: RwLock<HashSet<TaskGroupId>>,
}

impl DefaultExecutorRepresenter {
    /// Create a representer for an executor of the given type and capacity.
    ///
    /// # Panics
    /// Panics if `container_type` is the wildcard or `capacity` is zero;
    /// both indicate a bug in the container manager.
    pub fn new(
        executor_id: impl Into<String>,
        container_type: ContainerType,
        capacity: usize,
    ) -> Self {
        assert!(
            !container_type.is_any(),
            "executor container type must be concrete"
        );
        assert!(capacity > 0, "executor capacity must be positive");
        Self {
            executor_id: executor_id.into(),
            container_type,
            capacity,
            running: RwLock::new(HashSet::new()),
        }
    }
}

impl ExecutorRepresenter for DefaultExecutorRepresenter {
    fn executor_id(&self) -> &str {
        &self.executor_id
    }

    fn container_type(&self) -> ContainerType {
        self.container_type
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn running_task_groups(&self) -> HashSet<TaskGroupId> {
        self.running
            .read()
            .expect("running set lock poisoned during snapshot")
            .clone()
    }

    fn on_task_group_scheduled(&self, stg: &ScheduledTaskGroup) {
        let mut running = self
            .running
            .write()
            .expect("running set lock poisoned during schedule");
        running.insert(stg.task_group_id().to_string());
        debug!(
            executor_id = %self.executor_id,
            task_group_id = %stg.task_group_id(),
            occupied = running.len(),
            capacity = self.capacity,
            "task group occupies slot"
        );
    }

    fn on_task_group_execution_complete(&self, task_group_id: &str) {
        let mut running = self
            .running
            .write()
            .expect("running set lock poisoned during completion");
        running.remove(task_group_id);
        debug!(
            executor_id = %self.executor_id,
            task_group_id,
            occupied = running.len(),
            "task group released slot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskGroup;

    fn stg(id: &str) -> ScheduledTaskGroup {
        ScheduledTaskGroup::new(TaskGroup::new(id, "job-0", ContainerType::Compute))
    }

    #[test]
    fn test_new_representer_idle() {
        let rep = DefaultExecutorRepresenter::new("exec-a", ContainerType::Compute, 2);
        assert_eq!(rep.executor_id(), "exec-a");
        assert_eq!(rep.container_type(), ContainerType::Compute);
        assert_eq!(rep.capacity(), 2);
        assert!(rep.running_task_groups().is_empty());
        assert!(rep.has_free_slot());
    }

    #[test]
    fn test_slot_accounting() {
        let rep = DefaultExecutorRepresenter::new("exec-a", ContainerType::Compute, 2);

        rep.on_task_group_scheduled(&stg("tg-0"));
        assert!(rep.has_free_slot());

        rep.on_task_group_scheduled(&stg("tg-1"));
        assert!(!rep.has_free_slot());
        assert_eq!(rep.running_task_groups().len(), 2);

        rep.on_task_group_execution_complete("tg-0");
        assert!(rep.has_free_slot());
        assert!(rep.running_task_groups().contains("tg-1"));
    }

    #[test]
    fn test_complete_unknown_task_group_is_noop() {
        let rep = DefaultExecutorRepresenter::new("exec-a", ContainerType::Storage, 1);
        rep.on_task_group_execution_complete("tg-missing");
        assert!(rep.running_task_groups().is_empty());
    }

    #[test]
    #[should_panic(expected = "must be concrete")]
    fn test_wildcard_type_rejected() {
        let _ = DefaultExecutorRepresenter::new("exec-a", ContainerType::Any, 1);
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn test_zero_capacity_rejected() {
        let _ = DefaultExecutorRepresenter::new("exec-a", ContainerType::Compute, 0);
    }
}
