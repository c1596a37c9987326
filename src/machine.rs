//! Host machine capacity.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::container::{Error, Result};
use crate::fsutil;
use crate::info::MachineInfo;

/// One-shot source of [`MachineInfo`].
pub trait MachineInfoProvider {
    fn machine_info(&self) -> Result<MachineInfo>;
}

/// Reads machine capacity from procfs.
#[derive(Debug, Clone)]
pub struct ProcMachineInfo {
    proc_root: PathBuf,
}

impl ProcMachineInfo {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }
}

impl MachineInfoProvider for ProcMachineInfo {
    /// Reads `MemTotal` from `meminfo` and counts the `processor` entries of `cpuinfo`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be read or `MemTotal` is missing.
    fn machine_info(&self) -> Result<MachineInfo> {
        Ok(MachineInfo {
            num_cores: count_processors(&self.proc_root.join("cpuinfo"))?,
            memory_capacity: read_mem_total(&self.proc_root.join("meminfo"))?,
        })
    }
}

fn read_mem_total(path: &Path) -> Result<u64> {
    let reader = fsutil::open_file_reader(path)?;
    for line in reader.lines() {
        let line = line.map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let Some(rest) = line.strip_prefix("MemTotal:") else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let value = parts
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| Error::MissingField {
                field: "MemTotal",
                path: path.to_path_buf(),
            })?;
        return match parts.next() {
            Some("kB") => value.checked_mul(1024).ok_or_else(|| Error::OutOfRange {
                field: "MemTotal",
                path: path.to_path_buf(),
            }),
            _ => Ok(value),
        };
    }

    Err(Error::MissingField {
        field: "MemTotal",
        path: path.to_path_buf(),
    })
}

fn count_processors(path: &Path) -> Result<u32> {
    let reader = fsutil::open_file_reader(path)?;
    let mut count = 0;
    for line in reader.lines() {
        let line = line.map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if line
            .split_once(':')
            .is_some_and(|(key, _)| key.trim() == "processor")
        {
            count += 1;
        }
    }
    Ok(count)
}
