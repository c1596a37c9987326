//! In-memory host with scripted container handlers.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::container::{self, ContainerHandler, ContainerName, HandlerFactory, ListType};
use crate::info::{
    ContainerInfo, ContainerSpec, ContainerStats, ContainerStatsSummary, CpuStats, MachineInfo,
    MemorySpec, MemoryStats,
};
use crate::machine::MachineInfoProvider;

#[derive(Debug, Clone, Copy)]
pub(crate) enum StatsBehavior {
    Samples,
    Absent,
    Fail,
    Slow(Duration),
}

#[derive(Default)]
pub(crate) struct FakeHost {
    live: Mutex<BTreeSet<String>>,
    behaviors: Mutex<HashMap<String, StatsBehavior>>,
    memory_limits: Mutex<HashMap<String, u64>>,
    failing_handlers: Mutex<HashSet<String>>,
    failing_specs: Mutex<HashSet<String>>,
    failing_listing: AtomicBool,
}

impl FakeHost {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn add(&self, name: &str) {
        self.live.lock().unwrap().insert(name.to_owned());
    }

    pub(crate) fn remove(&self, name: &str) {
        self.live.lock().unwrap().remove(name);
    }

    pub(crate) fn set_behavior(&self, name: &str, behavior: StatsBehavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(name.to_owned(), behavior);
    }

    pub(crate) fn set_memory_limit(&self, name: &str, limit: u64) {
        self.memory_limits
            .lock()
            .unwrap()
            .insert(name.to_owned(), limit);
    }

    pub(crate) fn fail_handler_creation(&self, name: &str, fail: bool) {
        let mut failing = self.failing_handlers.lock().unwrap();
        if fail {
            failing.insert(name.to_owned());
        } else {
            failing.remove(name);
        }
    }

    pub(crate) fn fail_spec(&self, name: &str) {
        self.failing_specs.lock().unwrap().insert(name.to_owned());
    }

    pub(crate) fn fail_listing(&self, fail: bool) {
        self.failing_listing.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn factory(self: &Arc<Self>) -> Arc<dyn HandlerFactory> {
        Arc::new(FakeFactory {
            host: Arc::clone(self),
        })
    }

    pub(crate) fn handler(self: &Arc<Self>, name: &ContainerName) -> Arc<dyn ContainerHandler> {
        Arc::new(FakeHandler {
            name: name.clone(),
            host: Arc::clone(self),
            readings: AtomicU64::new(0),
        })
    }

    fn behavior(&self, name: &str) -> StatsBehavior {
        self.behaviors
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(StatsBehavior::Samples)
    }
}

struct FakeFactory {
    host: Arc<FakeHost>,
}

impl HandlerFactory for FakeFactory {
    fn new_handler(&self, name: &ContainerName) -> container::Result<Arc<dyn ContainerHandler>> {
        if self.host.failing_handlers.lock().unwrap().contains(name.as_ref()) {
            return Err(container::Error::ContainerGone(name.to_string()));
        }
        Ok(self.host.handler(name))
    }
}

struct FakeHandler {
    name: ContainerName,
    host: Arc<FakeHost>,
    readings: AtomicU64,
}

impl FakeHandler {
    fn next_reading(&self) -> ContainerStats {
        let seq = self.readings.fetch_add(1, Ordering::SeqCst) + 1;
        ContainerStats {
            cpu: Some(CpuStats {
                usage_usec: seq,
                ..Default::default()
            }),
            memory: Some(MemoryStats {
                usage_bytes: seq * 1024,
                ..Default::default()
            }),
            io: None,
        }
    }
}

impl ContainerHandler for FakeHandler {
    fn spec(&self) -> container::Result<ContainerSpec> {
        if self.host.failing_specs.lock().unwrap().contains(self.name.as_ref()) {
            return Err(unavailable("spec"));
        }
        let limit = self
            .host
            .memory_limits
            .lock()
            .unwrap()
            .get(self.name.as_ref())
            .copied()
            .unwrap_or(0);
        Ok(ContainerSpec {
            cpu: None,
            memory: Some(MemorySpec { limit }),
        })
    }

    fn stats(&self) -> container::Result<Option<ContainerStats>> {
        match self.host.behavior(self.name.as_ref()) {
            StatsBehavior::Samples => Ok(Some(self.next_reading())),
            StatsBehavior::Absent => Ok(None),
            StatsBehavior::Fail => Err(unavailable("stats")),
            StatsBehavior::Slow(delay) => {
                std::thread::sleep(delay);
                Ok(Some(self.next_reading()))
            }
        }
    }

    fn stats_summary(&self) -> container::Result<ContainerStatsSummary> {
        let samples = self.readings.load(Ordering::SeqCst);
        Ok(ContainerStatsSummary {
            cpu_usage_percent: 0.0,
            max_memory_usage_bytes: samples * 1024,
            samples,
        })
    }

    fn list_containers(&self, list_type: ListType) -> container::Result<Vec<ContainerName>> {
        if self.host.failing_listing.load(Ordering::SeqCst) {
            return Err(unavailable("listing"));
        }
        let prefix = if self.name.is_root() {
            "/".to_owned()
        } else {
            format!("{}/", self.name)
        };
        self.host
            .live
            .lock()
            .unwrap()
            .iter()
            .filter_map(|name| name.strip_prefix(&prefix).map(|rest| (name, rest)))
            .filter(|(_, rest)| list_type == ListType::Recursive || !rest.contains('/'))
            .map(|(name, _)| ContainerName::new(name))
            .collect()
    }
}

pub(crate) struct FakeMachine(pub(crate) Option<MachineInfo>);

impl MachineInfoProvider for FakeMachine {
    fn machine_info(&self) -> container::Result<MachineInfo> {
        self.0
            .ok_or_else(|| unavailable("machine info"))
    }
}

fn unavailable(what: &str) -> container::Error {
    container::Error::Read {
        path: PathBuf::from(format!("/fake/{what}")),
        source: io::Error::other(format!("{what} unavailable")),
    }
}

/// Sequence numbers of the retained samples, oldest first.
pub(crate) fn usage_seqs(info: &ContainerInfo) -> Vec<u64> {
    info.stats
        .iter()
        .filter_map(|sample| sample.stats.cpu.map(|cpu| cpu.usage_usec))
        .collect()
}
