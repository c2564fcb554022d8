//! Round-Robin Scheduling Policy - The Concurrency Core
//!
//! Per-container-type round-robin placement with a bounded-wait admission
//! protocol. One global mutex guards all mutable state; each container type
//! carries a condition variable tied to that mutex, signalled whenever an
//! event may have produced a free slot of that type.
//!
//! # Concurrency Model:
//! - A single `Mutex` over the per-type registries and the cached
//!   representer map; every public operation holds it end to end
//! - `attempt_schedule` is the only suspension point: it waits on the
//!   requested type's condvar for at most the admission timeout and retries
//!   selection exactly once after a wake-up
//! - Free-slot events signal the specific type *and* the wildcard, so a
//!   waiter on `Any` is never starved by type-specific completions
//! - One `notify_one` per condvar per event: each event wakes at most one
//!   waiter per class

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::SchedulingError;
use crate::executor::{ContainerManager, ExecutorRepresenter};
use crate::metrics::{ScopedWaitTimer, SchedulerMetrics};
use crate::policy::SchedulingPolicy;
use crate::task::{ContainerType, ExecutorId, ScheduledTaskGroup, TaskGroupId};

/// Rotation bookkeeping for one container type.
///
/// `next_index` stays within `0..len` while `executors` is non-empty and is
/// reset to 0 when the list empties. It advances only when a selection
/// succeeds, so the rotation resumes where the last allocation happened.
struct TypeEntry {
    executors: Vec<ExecutorId>,
    next_index: usize,
    cond: Arc<Condvar>,
}

impl TypeEntry {
    fn new() -> Self {
        Self {
            executors: Vec::new(),
            next_index: 0,
            cond: Arc::new(Condvar::new()),
        }
    }
}

/// Everything guarded by the global scheduler mutex.
struct PolicyState {
    /// Per-type rotation entries. Created lazily on first reference and
    /// never deleted; the `Any` entry exists from construction.
    entries: HashMap<ContainerType, TypeEntry>,
    /// Cached snapshot of the container manager's representer map,
    /// refreshed on executor add/remove.
    executor_map: HashMap<ExecutorId, Arc<dyn ExecutorRepresenter>>,
}

impl PolicyState {
    fn ensure_entry(&mut self, container_type: ContainerType) {
        self.entries
            .entry(container_type)
            .or_insert_with(TypeEntry::new);
    }

    fn entry(&self, container_type: ContainerType) -> &TypeEntry {
        self.entries
            .get(&container_type)
            .expect("type entry initialized before use")
    }

    /// Round-robin probe over the candidates for `requested`.
    ///
    /// For a concrete type the candidates are that type's rotation list;
    /// for `Any` they are the concatenation of every concrete type's list
    /// in [`ContainerType::CONCRETE`] order, rotated by the `Any` cursor.
    /// The cursor advances past the chosen executor on success and is left
    /// untouched when every probe finds a full executor.
    fn select_executor(&mut self, requested: ContainerType) -> Option<ExecutorId> {
        let candidates: Vec<ExecutorId> = if requested.is_any() {
            ContainerType::CONCRETE
                .iter()
                .filter_map(|t| self.entries.get(t))
                .flat_map(|entry| entry.executors.iter().cloned())
                .collect()
        } else {
            self.entries.get(&requested)?.executors.clone()
        };

        if candidates.is_empty() {
            return None;
        }

        let n = candidates.len();
        let start = self.entry(requested).next_index;
        for i in 0..n {
            let probe = (start + i) % n;
            let executor_id = &candidates[probe];
            // Ids missing from the cached map never probe as free.
            let free = self
                .executor_map
                .get(executor_id)
                .map(|rep| rep.has_free_slot())
                .unwrap_or(false);
            if free {
                self.entries
                    .get_mut(&requested)
                    .expect("type entry initialized before use")
                    .next_index = (probe + 1) % n;
                return Some(executor_id.clone());
            }
        }
        None
    }

    /// Wake one waiter on the given type and one on the wildcard.
    fn signal_free_slot(&mut self, container_type: ContainerType) {
        self.ensure_entry(container_type);
        self.entry(container_type).cond.notify_one();
        self.entry(ContainerType::Any).cond.notify_one();
    }
}

/// Thread-safe, blocking, per-container-type round-robin dispatcher.
///
/// Shared between the batch scheduler thread calling
/// [`attempt_schedule`](SchedulingPolicy::attempt_schedule) and the
/// executor-lifecycle threads driving the `on_*` callbacks.
pub struct RoundRobinSchedulingPolicy {
    state: Mutex<PolicyState>,
    container_manager: Arc<dyn ContainerManager>,
    schedule_timeout: Duration,
    metrics: Arc<SchedulerMetrics>,
}

impl RoundRobinSchedulingPolicy {
    /// Create a policy reading executor snapshots from `container_manager`.
    pub fn new(container_manager: Arc<dyn ContainerManager>, config: &SchedulerConfig) -> Self {
        let mut entries = HashMap::new();
        // The wildcard entry exists from the start so "any type" lookups
        // never miss.
        entries.insert(ContainerType::Any, TypeEntry::new());
        Self {
            state: Mutex::new(PolicyState {
                entries,
                executor_map: HashMap::new(),
            }),
            container_manager,
            schedule_timeout: config.schedule_timeout(),
            metrics: SchedulerMetrics::new(),
        }
    }

    /// Scheduling metrics for this policy.
    pub fn metrics(&self) -> Arc<SchedulerMetrics> {
        self.metrics.clone()
    }
}

impl SchedulingPolicy for RoundRobinSchedulingPolicy {
    fn attempt_schedule(
        &self,
        stg: &ScheduledTaskGroup,
    ) -> Result<Option<ExecutorId>, SchedulingError> {
        let requested = stg.required_container_type();
        self.metrics.record_attempt();

        let mut state = self
            .state
            .lock()
            .map_err(|_| SchedulingError::LockPoisoned("attempt_schedule"))?;
        state.ensure_entry(requested);

        if let Some(executor_id) = state.select_executor(requested) {
            self.metrics.record_placement();
            debug!(
                task_group_id = %stg.task_group_id(),
                executor_id = %executor_id,
                "placed without waiting"
            );
            return Ok(Some(executor_id));
        }

        if self.schedule_timeout.is_zero() {
            self.metrics.record_wait_timeout();
            return Ok(None);
        }

        debug!(
            task_group_id = %stg.task_group_id(),
            container_type = %requested,
            timeout_ms = self.schedule_timeout.as_millis() as u64,
            "no free slot, waiting for one"
        );
        let cond = state.entry(requested).cond.clone();
        let (mut state, wait) = {
            let _timer = ScopedWaitTimer::new(&self.metrics);
            cond.wait_timeout(state, self.schedule_timeout)
                .map_err(|_| SchedulingError::LockPoisoned("attempt_schedule wait"))?
        };

        if wait.timed_out() {
            self.metrics.record_wait_timeout();
            debug!(
                task_group_id = %stg.task_group_id(),
                container_type = %requested,
                "admission wait timed out"
            );
            return Ok(None);
        }

        // Single retry after the wake-up; the slot may already be gone to
        // another caller, in which case the caller loops.
        self.metrics.record_wakeup();
        let selected = state.select_executor(requested);
        match &selected {
            Some(executor_id) => {
                self.metrics.record_placement();
                debug!(
                    task_group_id = %stg.task_group_id(),
                    executor_id = %executor_id,
                    "placed after wake-up"
                );
            }
            None => debug!(
                task_group_id = %stg.task_group_id(),
                "wake-up arrived but the slot was already taken"
            ),
        }
        Ok(selected)
    }

    fn on_executor_added(&self, executor_id: &str) {
        let mut state = self
            .state
            .lock()
            .expect("scheduler lock poisoned during on_executor_added");
        state.executor_map = self.container_manager.executor_representer_map();

        let container_type = match state.executor_map.get(executor_id) {
            Some(representer) => representer.container_type(),
            None => {
                warn!(
                    executor_id,
                    "added executor absent from container manager snapshot"
                );
                return;
            }
        };

        state.ensure_entry(container_type);
        let entry = state
            .entries
            .get_mut(&container_type)
            .expect("type entry initialized before use");
        if !entry.executors.iter().any(|id| id == executor_id) {
            // Insert at the cursor: the newcomer is probed next, ahead of
            // the rotation's current target.
            let position = entry.next_index;
            entry.executors.insert(position, executor_id.to_string());
        }
        let fleet = entry.executors.len();
        info!(
            executor_id,
            container_type = %container_type,
            fleet,
            "executor joined rotation"
        );
        self.metrics.record_executor_added();
        state.signal_free_slot(container_type);
    }

    fn on_executor_removed(&self, executor_id: &str) -> HashSet<TaskGroupId> {
        let mut state = self
            .state
            .lock()
            .expect("scheduler lock poisoned during on_executor_removed");

        // Resolve through the cached map from before the refresh; the
        // container manager may already have dropped this executor.
        let Some(representer) = state.executor_map.get(executor_id).cloned() else {
            warn!(executor_id, "removal callback for executor not in cached map");
            return HashSet::new();
        };
        let container_type = representer.container_type();

        state.ensure_entry(container_type);
        let entry = state
            .entries
            .get_mut(&container_type)
            .expect("type entry initialized before use");
        if let Some(position) = entry.executors.iter().position(|id| id == executor_id) {
            if position < entry.next_index {
                // An earlier entry is gone; the cursor shifts left with it.
                entry.next_index -= 1;
            } else if position == entry.next_index {
                // The cursor's target is gone; restart the rotation.
                entry.next_index = 0;
            }
            entry.executors.remove(position);
        }

        state.executor_map = self.container_manager.executor_representer_map();
        self.metrics.record_executor_removed();

        // Removal never creates a free slot, so nothing is signalled.
        let orphaned = representer.running_task_groups();
        info!(
            executor_id,
            container_type = %container_type,
            orphaned = orphaned.len(),
            "executor left rotation"
        );
        orphaned
    }

    fn on_task_group_scheduled(&self, executor_id: &str, stg: &ScheduledTaskGroup) {
        let state = self
            .state
            .lock()
            .expect("scheduler lock poisoned during on_task_group_scheduled");
        match state.executor_map.get(executor_id) {
            Some(representer) => representer.on_task_group_scheduled(stg),
            None => warn!(
                executor_id,
                task_group_id = %stg.task_group_id(),
                "scheduled callback for unknown executor"
            ),
        }
    }

    fn on_task_group_execution_complete(&self, executor_id: &str, task_group_id: &str) {
        let mut state = self
            .state
            .lock()
            .expect("scheduler lock poisoned during on_task_group_execution_complete");
        let Some(representer) = state.executor_map.get(executor_id).cloned() else {
            warn!(
                executor_id,
                task_group_id, "completion callback for unknown executor"
            );
            return;
        };
        representer.on_task_group_execution_complete(task_group_id);
        self.metrics.record_task_group_completed();
        debug!(executor_id, task_group_id, "task group completed");
        state.signal_free_slot(representer.container_type());
    }

    fn on_task_group_execution_failed(&self, executor_id: &str, task_group_id: &str) {
        let mut state = self
            .state
            .lock()
            .expect("scheduler lock poisoned during on_task_group_execution_failed");
        let Some(representer) = state.executor_map.get(executor_id).cloned() else {
            warn!(
                executor_id,
                task_group_id, "failure callback for unknown executor"
            );
            return;
        };
        // The failed task group no longer occupies its slot; whether to
        // retry it elsewhere is the caller's call.
        representer.on_task_group_execution_complete(task_group_id);
        self.metrics.record_task_group_failed();
        warn!(executor_id, task_group_id, "task group failed");
        state.signal_free_slot(representer.container_type());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{DefaultExecutorRepresenter, InMemoryContainerManager};
    use crate::task::TaskGroup;
    use std::time::Instant;

    fn config_no_wait() -> SchedulerConfig {
        SchedulerConfig {
            schedule_timeout_ms: 0,
            max_schedule_attempts: 1,
        }
    }

    fn fleet(
        executors: &[(&str, ContainerType, usize)],
    ) -> (Arc<InMemoryContainerManager>, RoundRobinSchedulingPolicy) {
        let manager = Arc::new(InMemoryContainerManager::new());
        let policy = RoundRobinSchedulingPolicy::new(manager.clone(), &config_no_wait());
        for (executor_id, container_type, capacity) in executors {
            manager.register(Arc::new(DefaultExecutorRepresenter::new(
                *executor_id,
                *container_type,
                *capacity,
            )));
            policy.on_executor_added(executor_id);
        }
        (manager, policy)
    }

    fn stg(id: &str, container_type: ContainerType) -> ScheduledTaskGroup {
        ScheduledTaskGroup::new(TaskGroup::new(id, "job-0", container_type))
    }

    /// Schedule one task group and commit the placement.
    fn place(policy: &RoundRobinSchedulingPolicy, request: &ScheduledTaskGroup) -> ExecutorId {
        let executor_id = policy
            .attempt_schedule(request)
            .unwrap()
            .expect("a free executor");
        policy.on_task_group_scheduled(&executor_id, request);
        executor_id
    }

    fn next_index(policy: &RoundRobinSchedulingPolicy, container_type: ContainerType) -> usize {
        policy.state.lock().unwrap().entry(container_type).next_index
    }

    #[test]
    fn test_round_robin_order_and_wrap() {
        let (_, policy) = fleet(&[
            ("exec-a", ContainerType::Compute, 1),
            ("exec-b", ContainerType::Compute, 1),
            ("exec-c", ContainerType::Compute, 1),
        ]);

        assert_eq!(place(&policy, &stg("tg-0", ContainerType::Compute)), "exec-a");
        assert_eq!(place(&policy, &stg("tg-1", ContainerType::Compute)), "exec-b");
        assert_eq!(place(&policy, &stg("tg-2", ContainerType::Compute)), "exec-c");

        // Cursor wrapped back to the front.
        assert_eq!(next_index(&policy, ContainerType::Compute), 0);
    }

    #[test]
    fn test_full_fleet_returns_none_and_keeps_cursor() {
        let (_, policy) = fleet(&[
            ("exec-a", ContainerType::Compute, 1),
            ("exec-b", ContainerType::Compute, 1),
        ]);
        place(&policy, &stg("tg-0", ContainerType::Compute));
        let cursor = next_index(&policy, ContainerType::Compute);

        // exec-b is free, exec-a is full: placement still succeeds.
        assert_eq!(place(&policy, &stg("tg-1", ContainerType::Compute)), "exec-b");

        // Everything full now: selection misses and the cursor stays put.
        let miss = policy
            .attempt_schedule(&stg("tg-2", ContainerType::Compute))
            .unwrap();
        assert!(miss.is_none());
        assert_eq!(next_index(&policy, ContainerType::Compute), (cursor + 1) % 2);
    }

    #[test]
    fn test_capacity_allows_multiple_task_groups() {
        let (_, policy) = fleet(&[("exec-a", ContainerType::Compute, 2)]);
        assert_eq!(place(&policy, &stg("tg-0", ContainerType::Compute)), "exec-a");
        assert_eq!(place(&policy, &stg("tg-1", ContainerType::Compute)), "exec-a");
        assert!(policy
            .attempt_schedule(&stg("tg-2", ContainerType::Compute))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_added_executor_inserted_at_cursor() {
        let (manager, policy) = fleet(&[
            ("exec-a", ContainerType::Compute, 1),
            ("exec-b", ContainerType::Compute, 1),
            ("exec-c", ContainerType::Compute, 1),
        ]);
        // Cursor moves to 1 (pointing at exec-b).
        place(&policy, &stg("tg-0", ContainerType::Compute));

        manager.register(Arc::new(DefaultExecutorRepresenter::new(
            "exec-d",
            ContainerType::Compute,
            1,
        )));
        policy.on_executor_added("exec-d");

        // The newcomer landed at the cursor and is probed next.
        assert_eq!(place(&policy, &stg("tg-1", ContainerType::Compute)), "exec-d");
    }

    #[test]
    fn test_removal_before_cursor_shifts_it_left() {
        let (manager, policy) = fleet(&[
            ("exec-a", ContainerType::Compute, 1),
            ("exec-b", ContainerType::Compute, 1),
            ("exec-c", ContainerType::Compute, 1),
        ]);
        place(&policy, &stg("tg-0", ContainerType::Compute));
        assert_eq!(next_index(&policy, ContainerType::Compute), 1);

        manager.deregister("exec-a");
        policy.on_executor_removed("exec-a");

        assert_eq!(next_index(&policy, ContainerType::Compute), 0);
        // exec-b is still the next target, as before the removal.
        assert_eq!(place(&policy, &stg("tg-1", ContainerType::Compute)), "exec-b");
    }

    #[test]
    fn test_removal_at_cursor_restarts_rotation() {
        let (manager, policy) = fleet(&[
            ("exec-a", ContainerType::Compute, 1),
            ("exec-b", ContainerType::Compute, 1),
            ("exec-c", ContainerType::Compute, 1),
        ]);
        // Move the cursor onto exec-b, then free exec-a again.
        place(&policy, &stg("tg-0", ContainerType::Compute));
        policy.on_task_group_execution_complete("exec-a", "tg-0");

        manager.deregister("exec-b");
        policy.on_executor_removed("exec-b");

        assert_eq!(next_index(&policy, ContainerType::Compute), 0);
        assert_eq!(place(&policy, &stg("tg-1", ContainerType::Compute)), "exec-a");
    }

    #[test]
    fn test_removal_after_cursor_leaves_it_alone() {
        let (manager, policy) = fleet(&[
            ("exec-a", ContainerType::Compute, 1),
            ("exec-b", ContainerType::Compute, 1),
            ("exec-c", ContainerType::Compute, 1),
        ]);
        place(&policy, &stg("tg-0", ContainerType::Compute));
        assert_eq!(next_index(&policy, ContainerType::Compute), 1);

        manager.deregister("exec-c");
        policy.on_executor_removed("exec-c");

        assert_eq!(next_index(&policy, ContainerType::Compute), 1);
        assert_eq!(place(&policy, &stg("tg-1", ContainerType::Compute)), "exec-b");
    }

    #[test]
    fn test_removal_returns_orphaned_task_groups() {
        let (manager, policy) = fleet(&[("exec-a", ContainerType::Storage, 2)]);
        place(&policy, &stg("tg-0", ContainerType::Storage));
        place(&policy, &stg("tg-1", ContainerType::Storage));

        manager.deregister("exec-a");
        let orphaned = policy.on_executor_removed("exec-a");

        assert_eq!(orphaned.len(), 2);
        assert!(orphaned.contains("tg-0"));
        assert!(orphaned.contains("tg-1"));

        // Gone from the rotation: nothing left to select.
        assert!(policy
            .attempt_schedule(&stg("tg-2", ContainerType::Storage))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_completion_frees_slot() {
        let (_, policy) = fleet(&[("exec-a", ContainerType::Compute, 1)]);
        place(&policy, &stg("tg-0", ContainerType::Compute));
        assert!(policy
            .attempt_schedule(&stg("tg-1", ContainerType::Compute))
            .unwrap()
            .is_none());

        policy.on_task_group_execution_complete("exec-a", "tg-0");

        assert_eq!(place(&policy, &stg("tg-1", ContainerType::Compute)), "exec-a");
    }

    #[test]
    fn test_failure_frees_slot() {
        let (_, policy) = fleet(&[("exec-a", ContainerType::Compute, 1)]);
        place(&policy, &stg("tg-0", ContainerType::Compute));

        policy.on_task_group_execution_failed("exec-a", "tg-0");

        assert_eq!(place(&policy, &stg("tg-1", ContainerType::Compute)), "exec-a");
        assert_eq!(policy.metrics().snapshot().task_groups_failed, 1);
    }

    #[test]
    fn test_empty_rotation_misses_immediately() {
        let (_, policy) = fleet(&[]);
        let started = Instant::now();
        let selected = policy
            .attempt_schedule(&stg("tg-0", ContainerType::Compute))
            .unwrap();
        assert!(selected.is_none());
        // Zero timeout: no admission wait happened.
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_lazy_entry_creation() {
        let (_, policy) = fleet(&[]);
        {
            let state = policy.state.lock().unwrap();
            assert!(state.entries.contains_key(&ContainerType::Any));
            assert!(!state.entries.contains_key(&ContainerType::Storage));
        }

        let _ = policy.attempt_schedule(&stg("tg-0", ContainerType::Storage));

        let state = policy.state.lock().unwrap();
        assert!(state.entries.contains_key(&ContainerType::Storage));
        assert_eq!(state.entry(ContainerType::Storage).next_index, 0);
    }

    #[test]
    fn test_unknown_executor_callbacks_tolerated() {
        let (_, policy) = fleet(&[("exec-a", ContainerType::Compute, 1)]);
        policy.on_executor_added("exec-ghost");
        policy.on_task_group_scheduled("exec-ghost", &stg("tg-0", ContainerType::Compute));
        policy.on_task_group_execution_complete("exec-ghost", "tg-0");
        assert!(policy.on_executor_removed("exec-ghost").is_empty());

        // The real executor is unaffected.
        assert_eq!(place(&policy, &stg("tg-1", ContainerType::Compute)), "exec-a");
    }

    #[test]
    fn test_cached_map_matches_rotation_membership() {
        let (manager, policy) = fleet(&[
            ("exec-a", ContainerType::Compute, 1),
            ("exec-b", ContainerType::Storage, 1),
        ]);

        manager.deregister("exec-a");
        policy.on_executor_removed("exec-a");

        let state = policy.state.lock().unwrap();
        let rotation_ids: HashSet<ExecutorId> = ContainerType::CONCRETE
            .iter()
            .filter_map(|t| state.entries.get(t))
            .flat_map(|entry| entry.executors.iter().cloned())
            .collect();
        let cached_ids: HashSet<ExecutorId> = state.executor_map.keys().cloned().collect();
        assert_eq!(rotation_ids, cached_ids);
    }

    #[test]
    fn test_any_requests_rotate_over_all_types() {
        let (_, policy) = fleet(&[
            ("exec-a", ContainerType::Compute, 1),
            ("exec-b", ContainerType::Compute, 1),
            ("exec-x", ContainerType::Storage, 1),
            ("exec-y", ContainerType::Storage, 1),
        ]);

        let mut order = Vec::new();
        for i in 0..4 {
            order.push(place(&policy, &stg(&format!("tg-{i}"), ContainerType::Any)));
        }

        // Concatenation order over the concrete types: both compute
        // executors first, then both storage executors, no repeats.
        assert_eq!(order, vec!["exec-a", "exec-b", "exec-x", "exec-y"]);
    }

    #[test]
    fn test_any_request_metricated_as_attempt() {
        let (_, policy) = fleet(&[("exec-a", ContainerType::Compute, 1)]);
        place(&policy, &stg("tg-0", ContainerType::Any));
        let snapshot = policy.metrics().snapshot();
        assert_eq!(snapshot.schedule_attempts, 1);
        assert_eq!(snapshot.placements, 1);
    }
}
