use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::container::{ContainerHandler, ContainerName, Error, HandlerFactory, ListType, Result};
use crate::fsutil;
use crate::info::{
    ContainerSpec, ContainerStats, ContainerStatsSummary, CpuStats, IoStats, MemorySpec,
    MemoryStats,
};

use super::stats::{self, KeyedStat, StatParseError};

#[derive(Debug, Default)]
struct SummaryState {
    last_cpu: Option<(Instant, u64)>,
    summary: ContainerStatsSummary,
}

/// Reads a container's limits and usage from its cgroup v2 directory.
#[derive(Debug)]
pub struct CgroupHandler {
    name: ContainerName,
    path: PathBuf,
    summary: Mutex<SummaryState>,
}

impl CgroupHandler {
    /// Creates a handler for `name` below `cgroup_root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContainerGone`] if the container's cgroup directory does not exist.
    pub fn new(cgroup_root: &Path, name: ContainerName) -> Result<Self> {
        let path = cgroup_root.join(name.relative_path());
        if !path.is_dir() {
            return Err(Error::ContainerGone(name.to_string()));
        }
        log::trace!("cgroup_path={}", path.display());

        Ok(Self {
            name,
            path,
            summary: Mutex::default(),
        })
    }

    /// Parses the interface file `file`, or returns `None` if the controller does not
    /// provide it.
    fn read_optional<T>(
        &self,
        file: &str,
        parse: impl FnOnce(&mut BufReader<File>) -> std::result::Result<T, StatParseError>,
    ) -> Result<Option<T>> {
        let path = self.path.join(file);
        let Some(mut reader) = fsutil::open_optional_file_reader(&path)? else {
            if !self.path.is_dir() {
                return Err(Error::ContainerGone(self.name.to_string()));
            }
            return Ok(None);
        };

        parse(&mut reader)
            .map(Some)
            .map_err(|source| Error::Parse { path, source })
    }

    fn record(&self, cpu: Option<&CpuStats>, memory: Option<&MemoryStats>) {
        let now = Instant::now();
        let mut state = self.summary.lock().unwrap_or_else(PoisonError::into_inner);
        state.summary.samples += 1;

        if let Some(memory) = memory {
            state.summary.max_memory_usage_bytes =
                state.summary.max_memory_usage_bytes.max(memory.usage_bytes);
        }
        if let Some(cpu) = cpu {
            if let Some((then, previous)) = state.last_cpu {
                let elapsed_usec = now.duration_since(then).as_micros() as f64;
                if elapsed_usec > 0.0 {
                    state.summary.cpu_usage_percent =
                        cpu.usage_usec.saturating_sub(previous) as f64 / elapsed_usec * 100.0;
                }
            }
            state.last_cpu = Some((now, cpu.usage_usec));
        }
    }

    fn collect_children(
        &self,
        dir: &Path,
        parent: &ContainerName,
        list_type: ListType,
        out: &mut Vec<ContainerName>,
    ) -> Result<()> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            // A nested cgroup removed while walking the tree.
            Err(err) if err.kind() == io::ErrorKind::NotFound && dir != self.path => {
                return Ok(());
            }
            Err(source) => {
                return Err(Error::Read {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        };

        for entry in entries {
            let entry = entry.map_err(|source| Error::Read {
                path: dir.to_path_buf(),
                source,
            })?;
            let is_dir = entry.file_type().is_ok_and(|file_type| file_type.is_dir());
            if !is_dir {
                continue;
            }
            let file_name = entry.file_name();
            let Some(child) = file_name.to_str() else {
                log::warn!("skipping cgroup with non UTF-8 name `{}`", entry.path().display());
                continue;
            };

            let name = parent.join(child)?;
            if list_type == ListType::Recursive {
                self.collect_children(&entry.path(), &name, list_type, out)?;
            }
            out.push(name);
        }
        Ok(())
    }
}

impl ContainerHandler for CgroupHandler {
    fn spec(&self) -> Result<ContainerSpec> {
        let cpu = self.read_optional("cpu.max", stats::parse_cpu_max)?;
        let limit = self
            .read_optional("memory.max", stats::parse_memory_max)?
            .unwrap_or_default();

        Ok(ContainerSpec {
            cpu,
            memory: Some(MemorySpec { limit }),
        })
    }

    fn stats(&self) -> Result<Option<ContainerStats>> {
        let cpu = self.read_optional("cpu.stat", CpuStats::from_reader)?;
        let usage = self.read_optional("memory.current", stats::parse_memory_current)?;
        let memory_stat = self.read_optional("memory.stat", MemoryStats::from_reader)?;
        let io = self.read_optional("io.stat", IoStats::from_reader)?;

        let memory = match (usage, memory_stat) {
            (None, None) => None,
            (usage, memory_stat) => Some(MemoryStats {
                usage_bytes: usage.unwrap_or_default(),
                ..memory_stat.unwrap_or_default()
            }),
        };
        self.record(cpu.as_ref(), memory.as_ref());

        Ok(Some(ContainerStats { cpu, memory, io }))
    }

    fn stats_summary(&self) -> Result<ContainerStatsSummary> {
        let state = self.summary.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(state.summary)
    }

    fn list_containers(&self, list_type: ListType) -> Result<Vec<ContainerName>> {
        let mut out = Vec::new();
        self.collect_children(&self.path, &self.name, list_type, &mut out)?;
        out.sort();
        Ok(out)
    }
}

/// Creates [`CgroupHandler`]s below a cgroup v2 mount point.
#[derive(Debug, Clone)]
pub struct CgroupHandlerFactory {
    cgroup_root: PathBuf,
}

impl CgroupHandlerFactory {
    pub fn new(cgroup_root: impl Into<PathBuf>) -> Self {
        Self {
            cgroup_root: cgroup_root.into(),
        }
    }
}

impl HandlerFactory for CgroupHandlerFactory {
    fn new_handler(&self, name: &ContainerName) -> Result<Arc<dyn ContainerHandler>> {
        Ok(Arc::new(CgroupHandler::new(&self.cgroup_root, name.clone())?))
    }
}
