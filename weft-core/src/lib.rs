//! Weft Core - Scheduling Core of a Distributed Dataflow Runtime
//!
//! Weft compiles dataflow jobs into DAGs of task groups and runs them on a
//! fleet of worker executors grouped by container type. This crate is the
//! scheduling core: the concurrent policy deciding which executor receives
//! the next task group, the executor registry it reads, and the batch
//! scheduler that drives it.
//!
//! # Scheduling Model:
//! - Per-container-type round-robin with a bounded-wait admission protocol
//! - One global mutex, one condition variable per container type
//! - Executor lifecycle and completion events wake blocked callers
//! - Placement retries and dispatch orchestration live in the batch
//!   scheduler, on top of the policy's single-attempt contract

pub mod config;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod policy;
pub mod scheduler;
pub mod task;

pub use config::SchedulerConfig;
pub use error::SchedulingError;
pub use executor::{
    ContainerManager, DefaultExecutorRepresenter, ExecutorRepresenter, InMemoryContainerManager,
};
pub use metrics::{MetricsSnapshot, SchedulerMetrics, ScopedWaitTimer};
pub use policy::{RoundRobinSchedulingPolicy, SchedulingPolicy};
pub use scheduler::{BatchScheduler, LocalDispatcher, TaskGroupDispatcher};
pub use task::{ContainerType, ExecutorId, ScheduledTaskGroup, TaskGroup, TaskGroupId};

use anyhow::Result;
use tracing::info;

/// Initialize the Weft runtime's tracing output.
pub async fn init() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Initializing Weft Scheduling Core v{}", env!("CARGO_PKG_VERSION"));
    info!("Policy: per-container-type round-robin");
    info!("Admission: bounded wait with condvar wake-ups");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init() {
        assert!(init().await.is_ok());
    }
}
