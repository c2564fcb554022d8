//! Weft Scheduling Throughput Demo
//!
//! Pushes a stream of task groups through the round-robin policy over a
//! mixed fleet, completing each batch before the next, and prints the
//! final scheduling report.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use weft_core::{
    BatchScheduler, ContainerType, DefaultExecutorRepresenter, InMemoryContainerManager,
    LocalDispatcher, RoundRobinSchedulingPolicy, SchedulerConfig, TaskGroup,
};

const BATCHES: usize = 100;
const FLEET_CAPACITY: usize = 6;

#[tokio::main]
async fn main() -> Result<()> {
    println!("Weft scheduling throughput demo");
    println!("fleet: 2 compute x2 slots, 1 storage x2 slots; {BATCHES} batches");

    let config = SchedulerConfig::default();
    let manager = Arc::new(InMemoryContainerManager::new());
    let policy = Arc::new(RoundRobinSchedulingPolicy::new(manager.clone(), &config));
    let scheduler = BatchScheduler::new(policy.clone(), Arc::new(LocalDispatcher), &config);

    for (executor_id, container_type) in [
        ("compute-0", ContainerType::Compute),
        ("compute-1", ContainerType::Compute),
        ("storage-0", ContainerType::Storage),
    ] {
        manager.register(Arc::new(DefaultExecutorRepresenter::new(
            executor_id,
            container_type,
            2,
        )));
        scheduler.on_executor_added(executor_id);
    }

    let start = Instant::now();
    let mut per_executor: HashMap<String, usize> = HashMap::new();

    for batch in 0..BATCHES {
        // Fill every slot in the fleet with wildcard requests...
        let mut placements = Vec::new();
        for i in 0..FLEET_CAPACITY {
            let task_group = TaskGroup::new(
                format!("tg-{batch}-{i}"),
                "job-throughput",
                ContainerType::Any,
            );
            let executor_id = scheduler.schedule_task_group(task_group).await?;
            *per_executor.entry(executor_id.clone()).or_default() += 1;
            placements.push((executor_id, format!("tg-{batch}-{i}")));
        }
        // ...then drain it.
        for (executor_id, task_group_id) in placements {
            scheduler.on_task_group_complete(&executor_id, &task_group_id);
        }
    }

    let elapsed = start.elapsed();
    let total = BATCHES * FLEET_CAPACITY;
    println!(
        "placed {total} task groups in {elapsed:?} ({:.1}/ms)",
        total as f64 / elapsed.as_millis().max(1) as f64
    );
    println!("placements per executor (round-robin should be even):");
    let mut counts: Vec<_> = per_executor.into_iter().collect();
    counts.sort();
    for (executor_id, count) in counts {
        println!("  {executor_id}: {count}");
    }

    policy.metrics().snapshot().print_report();

    Ok(())
}
