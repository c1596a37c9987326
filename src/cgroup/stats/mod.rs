//! Readers for the cgroup v2 interface files a [`CgroupHandler`](super::CgroupHandler)
//! consumes.
//!
//! Parsed values land directly in the payload types of [`crate::info`]:
//!
//! - `cpu.stat` → [`CpuStats`](crate::info::CpuStats), `cpu.max` → [`CpuSpec`](crate::info::CpuSpec)
//! - `memory.stat` and `memory.current` → [`MemoryStats`](crate::info::MemoryStats),
//!   `memory.max` → a memory limit
//! - `io.stat` → [`IoStats`](crate::info::IoStats)

mod cpu;
mod error;
mod io;
mod memory;
mod parser;

pub use cpu::parse_cpu_max;
pub use error::StatParseError;
pub use memory::{parse_memory_current, parse_memory_max};
pub use parser::{KeyedStat, read_single_value};
