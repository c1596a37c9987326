//! Value types exchanged with container handlers and returned to callers.
//!
//! Everything here is plain owned data: queries hand out copies, never
//! references into a collector's state.

use std::time::SystemTime;

use crate::container::ContainerName;

/// Memory limit value meaning "no limit configured".
pub const MEMORY_LIMIT_UNSET: u64 = 0;

/// Capacity of the host machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct MachineInfo {
    /// Number of logical CPUs.
    pub num_cores: u32,
    /// Total memory in bytes.
    pub memory_capacity: u64,
}

/// Configured limits of a container.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct ContainerSpec {
    pub cpu: Option<CpuSpec>,
    pub memory: Option<MemorySpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CpuSpec {
    /// CPU time in microseconds the container may use per `period`; `None` is unlimited.
    pub quota: Option<u64>,
    /// Length of an enforcement period in microseconds.
    pub period: u64,
}

impl Default for CpuSpec {
    fn default() -> Self {
        Self {
            quota: None,
            period: 100_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct MemorySpec {
    /// Memory limit in bytes, [`MEMORY_LIMIT_UNSET`] if unlimited.
    pub limit: u64,
}

/// One reading of a container's resource usage.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct ContainerStats {
    pub cpu: Option<CpuStats>,
    pub memory: Option<MemoryStats>,
    pub io: Option<IoStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct CpuStats {
    pub usage_usec: u64,
    pub user_usec: u64,
    pub system_usec: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct MemoryStats {
    pub usage_bytes: u64,
    pub anon_bytes: u64,
    pub file_bytes: u64,
}

/// I/O counters summed over all block devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct IoStats {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_ios: u64,
    pub write_ios: u64,
}

/// Latest aggregated view over a container's readings.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct ContainerStatsSummary {
    /// CPU usage between the two most recent readings, in percent of one core.
    pub cpu_usage_percent: f64,
    pub max_memory_usage_bytes: u64,
    /// Number of readings the summary was derived from.
    pub samples: u64,
}

/// A stats reading stamped with the time it was collected.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContainerStatsSample {
    pub timestamp: SystemTime,
    pub stats: ContainerStats,
}

/// Point-in-time snapshot of a tracked container.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ContainerInfo {
    pub name: ContainerName,
    pub subcontainers: Vec<ContainerName>,
    pub spec: ContainerSpec,
    /// Retained samples, oldest first.
    pub stats: Vec<ContainerStatsSample>,
    pub stats_summary: Option<ContainerStatsSummary>,
}

impl ContainerInfo {
    /// Replaces an unset memory limit with the machine's memory capacity.
    pub fn resolve_default_limits(&mut self, machine: &MachineInfo) {
        if let Some(memory) = self.spec.memory.as_mut() {
            if memory.limit == MEMORY_LIMIT_UNSET {
                memory.limit = machine.memory_capacity;
            }
        }
    }
}
