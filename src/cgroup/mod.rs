//! Container access through the Linux cgroup v2 filesystem.
//!
//! Every directory below the cgroup mount point is treated as a container named
//! after its path relative to the mount, e.g. `/system.slice/docker-abc.scope`.
//! The mount point itself is the root container `/`.
//!
//! # Key Components
//!
//! - [`CgroupHandler`] — Reads limits, usage and child cgroups of one container.
//! - [`CgroupHandlerFactory`] — Creates handlers for the manager.
//!
//! # Supported Files
//!
//! The following interface files are read, if available:
//!
//! - `cpu.stat` and `cpu.max`
//! - `memory.stat`, `memory.current`, and `memory.max`
//! - `io.stat`
//!
//! A missing file yields no data for its controller; a missing cgroup directory
//! is an error.
mod handler;
pub mod stats;

pub use handler::{CgroupHandler, CgroupHandlerFactory};
