//! Batch Scheduler - Driving the Scheduling Policy
//!
//! The batch scheduler sits between the DAG front-end and the scheduling
//! policy: it wraps task groups for placement, loops the policy's bounded
//! `attempt_schedule` until a slot is found or attempts run out, commits
//! placements, and ships the committed task group through the dispatcher
//! seam. Executor lifecycle and task-group completion events are forwarded
//! to the policy, and task groups orphaned by an executor removal are
//! rescheduled onto the remaining fleet.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::task;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::policy::SchedulingPolicy;
use crate::task::{ExecutorId, ScheduledTaskGroup, TaskGroup, TaskGroupId};

/// Transport seam: ships a committed task group to its executor.
///
/// The scheduling core owns no RPC; production dispatchers wrap whatever
/// transport the deployment uses.
#[async_trait]
pub trait TaskGroupDispatcher: Send + Sync {
    /// Ship a scheduled task group to the chosen executor.
    async fn dispatch(&self, executor_id: &str, stg: &ScheduledTaskGroup) -> Result<()>;
}

/// Dispatcher for in-process fleets: the placement is already recorded on
/// the representer, so there is nothing to ship.
pub struct LocalDispatcher;

#[async_trait]
impl TaskGroupDispatcher for LocalDispatcher {
    async fn dispatch(&self, executor_id: &str, stg: &ScheduledTaskGroup) -> Result<()> {
        debug!(
            executor_id,
            task_group_id = %stg.task_group_id(),
            "dispatching task group locally"
        );
        Ok(())
    }
}

/// Drives a [`SchedulingPolicy`] for one job's task groups.
pub struct BatchScheduler {
    policy: Arc<dyn SchedulingPolicy>,
    dispatcher: Arc<dyn TaskGroupDispatcher>,
    max_schedule_attempts: u32,
    /// Placements currently running, kept so task groups orphaned by an
    /// executor removal can be rescheduled.
    inflight: RwLock<HashMap<TaskGroupId, ScheduledTaskGroup>>,
}

impl BatchScheduler {
    /// Create a scheduler around the given policy and dispatcher.
    pub fn new(
        policy: Arc<dyn SchedulingPolicy>,
        dispatcher: Arc<dyn TaskGroupDispatcher>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            policy,
            dispatcher,
            max_schedule_attempts: config.max_schedule_attempts,
            inflight: RwLock::new(HashMap::new()),
        }
    }

    /// Place a task group on an executor and dispatch it.
    ///
    /// Each placement attempt may block inside the policy for up to the
    /// admission timeout, so the policy call runs on the blocking pool.
    /// Returns the chosen executor id, or an error once
    /// `max_schedule_attempts` attempts came back empty.
    pub async fn schedule_task_group(&self, task_group: TaskGroup) -> Result<ExecutorId> {
        self.schedule(ScheduledTaskGroup::new(task_group)).await
    }

    async fn schedule(&self, mut stg: ScheduledTaskGroup) -> Result<ExecutorId> {
        loop {
            stg.attempt += 1;
            let policy = self.policy.clone();
            let request = stg.clone();
            let selected = task::spawn_blocking(move || policy.attempt_schedule(&request))
                .await
                .context("scheduling task panicked")??;

            if let Some(executor_id) = selected {
                self.policy.on_task_group_scheduled(&executor_id, &stg);
                self.inflight
                    .write()
                    .expect("inflight lock poisoned during schedule")
                    .insert(stg.task_group_id().to_string(), stg.clone());
                self.dispatcher.dispatch(&executor_id, &stg).await?;
                info!(
                    task_group_id = %stg.task_group_id(),
                    executor_id = %executor_id,
                    attempt = stg.attempt,
                    "task group placed"
                );
                return Ok(executor_id);
            }

            if stg.attempt >= self.max_schedule_attempts {
                bail!(
                    "no executor available for task group {} after {} attempts",
                    stg.task_group_id(),
                    stg.attempt
                );
            }
            debug!(
                task_group_id = %stg.task_group_id(),
                attempt = stg.attempt,
                "placement attempt came back empty, retrying"
            );
        }
    }

    /// Forward an executor arrival to the policy.
    pub fn on_executor_added(&self, executor_id: &str) {
        self.policy.on_executor_added(executor_id);
    }

    /// Forward an executor removal to the policy, then reschedule every
    /// task group that was running on it. Returns the new placements.
    pub async fn on_executor_removed(&self, executor_id: &str) -> Result<Vec<ExecutorId>> {
        let orphaned = self.policy.on_executor_removed(executor_id);
        let mut placements = Vec::new();
        for task_group_id in orphaned {
            let stg = self
                .inflight
                .write()
                .expect("inflight lock poisoned during reschedule")
                .remove(&task_group_id);
            let Some(stg) = stg else {
                warn!(
                    task_group_id = %task_group_id,
                    "orphaned task group was never tracked, skipping reschedule"
                );
                continue;
            };
            info!(
                task_group_id = %task_group_id,
                executor_id,
                "rescheduling task group orphaned by executor removal"
            );
            placements.push(self.schedule(stg).await?);
        }
        Ok(placements)
    }

    /// A task group finished; free its slot and stop tracking it.
    pub fn on_task_group_complete(&self, executor_id: &str, task_group_id: &str) {
        self.policy
            .on_task_group_execution_complete(executor_id, task_group_id);
        self.inflight
            .write()
            .expect("inflight lock poisoned during completion")
            .remove(task_group_id);
    }

    /// A task group failed; free its slot and stop tracking it. Whether to
    /// resubmit is the job front-end's decision.
    pub fn on_task_group_failed(&self, executor_id: &str, task_group_id: &str) {
        self.policy
            .on_task_group_execution_failed(executor_id, task_group_id);
        self.inflight
            .write()
            .expect("inflight lock poisoned during failure")
            .remove(task_group_id);
    }

    /// Number of task groups currently placed and running.
    pub fn inflight_count(&self) -> usize {
        self.inflight
            .read()
            .expect("inflight lock poisoned during count")
            .len()
    }
}
