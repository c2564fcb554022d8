//! Task Groups and Container Types - The Units of Scheduling
//!
//! This module defines the data model shared between the DAG front-end,
//! the scheduling policy, and the executor fleet: container type classes,
//! task groups, and the scheduled wrapper that carries dispatch metadata.
//!
//! # Design Notes:
//! - Container types form a small, closed set; `Any` is a wildcard that
//!   only ever appears on a *request*, never on an executor
//! - Task groups are opaque to the policy beyond their id and required type
//! - All records are serde-serializable for dispatch payloads and logs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::SchedulingError;

/// Unique identifier of a task group within a job.
pub type TaskGroupId = String;

/// Unique identifier of an executor process.
pub type ExecutorId = String;

/// Hardware/role class of an executor container.
///
/// Executors are grouped by container type, and every task group names the
/// type it must run on. [`ContainerType::Any`] matches all concrete types
/// and is only valid as a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerType {
    /// Short-lived containers that may be reclaimed by the cluster.
    Transient,
    /// Long-lived containers reserved for the duration of a job.
    Reserved,
    /// Compute-optimized containers.
    Compute,
    /// Storage-optimized containers.
    Storage,
    /// Wildcard requirement: any concrete type is acceptable.
    Any,
}

impl ContainerType {
    /// All concrete (non-wildcard) container types, in the fixed order the
    /// scheduler iterates them when resolving an `Any` request.
    pub const CONCRETE: [ContainerType; 4] = [
        ContainerType::Transient,
        ContainerType::Reserved,
        ContainerType::Compute,
        ContainerType::Storage,
    ];

    /// Returns `true` for the wildcard type.
    pub fn is_any(&self) -> bool {
        matches!(self, ContainerType::Any)
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerType::Transient => "transient",
            ContainerType::Reserved => "reserved",
            ContainerType::Compute => "compute",
            ContainerType::Storage => "storage",
            ContainerType::Any => "any",
        };
        f.write_str(name)
    }
}

impl FromStr for ContainerType {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "transient" => Ok(ContainerType::Transient),
            "reserved" => Ok(ContainerType::Reserved),
            "compute" => Ok(ContainerType::Compute),
            "storage" => Ok(ContainerType::Storage),
            "any" => Ok(ContainerType::Any),
            other => Err(SchedulingError::InvalidConfig(format!(
                "unknown container type: {other}"
            ))),
        }
    }
}

/// The smallest unit of scheduling: a bundle of tasks dispatched together
/// to a single executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGroup {
    /// Unique task group ID
    pub task_group_id: TaskGroupId,
    /// ID of the job this task group belongs to
    pub job_id: String,
    /// Container type this task group must be placed on (may be `Any`)
    pub required_container_type: ContainerType,
}

impl TaskGroup {
    /// Create a task group requiring the given container type.
    pub fn new(
        task_group_id: impl Into<String>,
        job_id: impl Into<String>,
        required_container_type: ContainerType,
    ) -> Self {
        Self {
            task_group_id: task_group_id.into(),
            job_id: job_id.into(),
            required_container_type,
        }
    }
}

/// A task group handed to the scheduling policy, paired with dispatch
/// metadata the policy itself never interprets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTaskGroup {
    /// The task group being placed
    pub task_group: TaskGroup,
    /// How many placement attempts have been made so far
    pub attempt: u32,
    /// Opaque dispatch properties forwarded to the transport layer
    pub properties: HashMap<String, String>,
}

impl ScheduledTaskGroup {
    /// Wrap a task group for its first scheduling attempt.
    pub fn new(task_group: TaskGroup) -> Self {
        Self {
            task_group,
            attempt: 0,
            properties: HashMap::new(),
        }
    }

    /// The wrapped task group's id.
    pub fn task_group_id(&self) -> &str {
        &self.task_group.task_group_id
    }

    /// The container type this task group must be placed on.
    pub fn required_container_type(&self) -> ContainerType {
        self.task_group.required_container_type
    }
}
