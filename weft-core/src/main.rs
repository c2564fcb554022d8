//! Weft - Distributed Dataflow Runtime
//!
//! Scheduling-core entry point: builds a small in-memory executor fleet,
//! places a batch of task groups over it round-robin, and prints the
//! scheduling report.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use weft_core::{
    init, BatchScheduler, ContainerType, DefaultExecutorRepresenter, InMemoryContainerManager,
    LocalDispatcher, RoundRobinSchedulingPolicy, SchedulerConfig, TaskGroup,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the runtime
    init().await?;

    let config = SchedulerConfig::default();
    config.validate()?;

    // A demonstration fleet: two compute executors, one storage executor.
    let manager = Arc::new(InMemoryContainerManager::new());
    let policy = Arc::new(RoundRobinSchedulingPolicy::new(manager.clone(), &config));
    let scheduler = BatchScheduler::new(policy.clone(), Arc::new(LocalDispatcher), &config);

    for (executor_id, container_type, capacity) in [
        ("compute-0", ContainerType::Compute, 2),
        ("compute-1", ContainerType::Compute, 2),
        ("storage-0", ContainerType::Storage, 1),
    ] {
        manager.register(Arc::new(DefaultExecutorRepresenter::new(
            executor_id,
            container_type,
            capacity,
        )));
        scheduler.on_executor_added(executor_id);
    }

    info!("Scheduling demonstration batch");
    for i in 0..4 {
        let task_group = TaskGroup::new(format!("tg-{i}"), "job-demo", ContainerType::Compute);
        let executor_id = scheduler.schedule_task_group(task_group).await?;
        info!(task_group = %format!("tg-{i}"), executor = %executor_id, "placed");
    }
    let stored = scheduler
        .schedule_task_group(TaskGroup::new("tg-store", "job-demo", ContainerType::Storage))
        .await?;
    info!(executor = %stored, "storage task group placed");

    // Drain the batch so the fleet ends idle.
    for i in 0..4 {
        let executor = if i % 2 == 0 { "compute-0" } else { "compute-1" };
        scheduler.on_task_group_complete(executor, &format!("tg-{i}"));
    }
    scheduler.on_task_group_complete("storage-0", "tg-store");

    policy.metrics().snapshot().print_report();

    Ok(())
}
