//! Container Manager - Authoritative Registry of Live Executors
//!
//! The container manager owns the mapping from executor id to its
//! [`ExecutorRepresenter`]. The scheduling policy never walks this registry
//! directly; it pulls a snapshot on executor lifecycle events and works
//! against its own cached copy under the scheduler lock.
//!
//! # Concurrency Pattern: Read-Heavy RwLock
//! The fleet changes rarely compared to how often it is snapshotted, so the
//! registry allows unlimited concurrent readers and only blocks on the rare
//! register/deregister path.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::executor::ExecutorRepresenter;
use crate::task::ExecutorId;

/// Source of executor representer snapshots consumed by the scheduler.
pub trait ContainerManager: Send + Sync {
    /// A point-in-time copy of the executor id to representer mapping.
    fn executor_representer_map(&self) -> HashMap<ExecutorId, Arc<dyn ExecutorRepresenter>>;
}

/// In-process container manager tracking the live executor fleet.
///
/// Container discovery and process supervision live outside the scheduling
/// core; whatever performs them registers and deregisters representers here
/// and raises the matching policy callbacks.
pub struct InMemoryContainerManager {
    executors: RwLock<HashMap<ExecutorId, Arc<dyn ExecutorRepresenter>>>,
}

impl InMemoryContainerManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            executors: RwLock::new(HashMap::new()),
        }
    }

    /// Register a representer for a newly discovered executor.
    pub fn register(&self, representer: Arc<dyn ExecutorRepresenter>) {
        let executor_id = representer.executor_id().to_string();
        info!(
            executor_id = %executor_id,
            container_type = %representer.container_type(),
            capacity = representer.capacity(),
            "registering executor"
        );
        self.executors
            .write()
            .expect("executor registry lock poisoned during register")
            .insert(executor_id, representer);
    }

    /// Remove an executor's representer, returning it if it existed.
    pub fn deregister(&self, executor_id: &str) -> Option<Arc<dyn ExecutorRepresenter>> {
        let removed = self
            .executors
            .write()
            .expect("executor registry lock poisoned during deregister")
            .remove(executor_id);
        if removed.is_some() {
            debug!(executor_id, "deregistered executor");
        }
        removed
    }

    /// Look up a single representer by id.
    pub fn get(&self, executor_id: &str) -> Option<Arc<dyn ExecutorRepresenter>> {
        self.executors
            .read()
            .expect("executor registry lock poisoned during get")
            .get(executor_id)
            .cloned()
    }

    /// Number of registered executors.
    pub fn len(&self) -> usize {
        self.executors
            .read()
            .expect("executor registry lock poisoned during len")
            .len()
    }

    /// Returns `true` when no executors are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContainerManager for InMemoryContainerManager {
    fn executor_representer_map(&self) -> HashMap<ExecutorId, Arc<dyn ExecutorRepresenter>> {
        self.executors
            .read()
            .expect("executor registry lock poisoned during snapshot")
            .clone()
    }
}

impl Default for InMemoryContainerManager {
    fn default() -> Self {
        Self::new()
    }
}
