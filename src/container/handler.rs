use std::sync::Arc;

use crate::info::{ContainerSpec, ContainerStats, ContainerStatsSummary};

use super::{ContainerName, Result};

/// Which containers [`ContainerHandler::list_containers`] should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    /// Only the direct children of the container.
    SelfOnly,
    /// Every descendant of the container.
    Recursive,
}

/// Platform access to a single container.
///
/// Calls may block on system calls; callers inside the async runtime must
/// run them on the blocking pool.
pub trait ContainerHandler: Send + Sync {
    fn spec(&self) -> Result<ContainerSpec>;

    /// Reads a new stats sample. `Ok(None)` means nothing new is available.
    fn stats(&self) -> Result<Option<ContainerStats>>;

    fn stats_summary(&self) -> Result<ContainerStatsSummary>;

    fn list_containers(&self, list_type: ListType) -> Result<Vec<ContainerName>>;
}

/// Creates the [`ContainerHandler`] a collector is bound to.
pub trait HandlerFactory: Send + Sync {
    fn new_handler(&self, name: &ContainerName) -> Result<Arc<dyn ContainerHandler>>;
}
