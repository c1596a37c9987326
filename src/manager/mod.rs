//! Tracking of live containers and their collectors.
//!
//! The [`Manager`] owns one [`ContainerData`] collector per live container. A
//! single reconciliation loop, started by [`Manager::start`], periodically
//! compares the tracked containers with the containers reported by the root
//! container's handler and creates or destroys collectors accordingly. Each
//! collector refreshes its own stats on an independent housekeeping task.
//!
//! # Key Components
//!
//! - [`Manager`] — Registry of collectors, query surface and reconciliation loop.
//! - [`ContainerData`] — Per-container collector with a bounded stats history.
//! - [`StatsHistory`] — Fixed-capacity FIFO of stats samples.
//!
//! # Concurrency
//!
//! Only the reconciler mutates the registry; it takes `&mut self` and a manager
//! hands out at most one at a time. Queries look collectors up through shard
//! read locks and never hold them while calling into a collector.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::time::MissedTickBehavior;

use crate::config::ManagerConfig;
use crate::container::{ContainerName, HandlerFactory, ListType, ROOT_CONTAINER};
use crate::error::error_chain;
use crate::info::{ContainerInfo, MachineInfo};
use crate::machine::MachineInfoProvider;

mod container;
mod error;
mod history;
#[cfg(test)]
pub(crate) mod testing;

pub use container::{ContainerData, HousekeepingStatus};
pub use error::{Error, Result};
pub use history::StatsHistory;

/// Reconciliation passes taking at least this long are reported.
const SLOW_GLOBAL_HOUSEKEEPING_THRESHOLD: Duration = Duration::from_millis(100);

/// How long a destroy waits for the collector's in-flight tick before moving on.
const DESTROY_JOIN_TIMEOUT: Duration = Duration::from_millis(50);

/// Registry of the containers on this machine.
pub struct Manager {
    containers: DashMap<ContainerName, Arc<ContainerData>>,
    machine_info: MachineInfo,
    factory: Arc<dyn HandlerFactory>,
    config: ManagerConfig,
    reconciling: AtomicBool,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("containers", &self.containers.len())
            .field("machine_info", &self.machine_info)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Manager {
    /// Creates a manager that tracks no containers yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MachineInfo`] if the machine info cannot be fetched.
    pub fn new(
        machine_info_provider: &dyn MachineInfoProvider,
        factory: Arc<dyn HandlerFactory>,
        config: ManagerConfig,
    ) -> Result<Self> {
        let machine_info = machine_info_provider
            .machine_info()
            .map_err(Error::MachineInfo)?;
        match serde_json::to_string(&machine_info) {
            Ok(json) => log::info!("Machine: {json}"),
            Err(err) => log::warn!("failed to serialize machine info: {err}"),
        }

        Ok(Self {
            containers: DashMap::new(),
            machine_info,
            factory,
            config,
            reconciling: AtomicBool::new(false),
        })
    }

    /// Tracks the root container, recovers all existing containers and then
    /// keeps looking for new and removed containers. Runs until an error
    /// aborts startup.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyStarted`] if the manager is already running.
    /// - The error of creating the root container or of the initial recovery.
    ///
    /// A manager whose start failed can be started again; collectors created
    /// by the failed attempt are kept.
    pub async fn start(&self) -> Result<()> {
        let mut reconciler = self.reconciler()?;
        if !self.containers.contains_key(ROOT_CONTAINER) {
            reconciler.create_container(ContainerName::root()).await?;
        }

        log::info!("Starting recovery of all containers");
        reconciler.detect_containers().await?;
        log::info!("Recovery completed");

        let mut ticker = tokio::time::interval(self.config.global_housekeeping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let start = Instant::now();

            if let Err(err) = reconciler.detect_containers().await {
                log::error!("Failed to detect containers: {}", error_chain(&err));
            }

            let duration = start.elapsed();
            if duration >= SLOW_GLOBAL_HOUSEKEEPING_THRESHOLD {
                log::warn!("Global Housekeeping took {duration:?}");
            }
        }
    }

    /// Returns a snapshot of the container `name`.
    ///
    /// An unset memory limit is reported as the machine's memory capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownContainer`] if `name` is not tracked, or the
    /// collector's error if refreshing its spec or subcontainers fails.
    pub async fn container_info(&self, name: &str) -> Result<ContainerInfo> {
        log::debug!("Get({name})");
        let cont = self
            .containers
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::UnknownContainer(name.to_owned()))?;

        let mut info = cont.get_info().await?;
        info.resolve_default_limits(&self.machine_info);
        Ok(info)
    }

    pub fn machine_info(&self) -> MachineInfo {
        self.machine_info
    }

    /// Names of all tracked containers, sorted.
    pub fn tracked_containers(&self) -> Vec<ContainerName> {
        let mut names: Vec<ContainerName> = self
            .containers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Hands out the only handle allowed to add or remove containers.
    pub(crate) fn reconciler(&self) -> Result<Reconciler<'_>> {
        if self.reconciling.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyStarted);
        }
        Ok(Reconciler { manager: self })
    }
}

/// Exclusive writer of a [`Manager`]'s container registry.
pub(crate) struct Reconciler<'a> {
    manager: &'a Manager,
}

impl Drop for Reconciler<'_> {
    fn drop(&mut self) {
        self.manager.reconciling.store(false, Ordering::Release);
    }
}

impl Reconciler<'_> {
    /// Creates a collector for `name`, registers it and starts its housekeeping.
    ///
    /// Fails with [`Error::AlreadyTracked`] if `name` already has a collector.
    pub(crate) async fn create_container(
        &mut self,
        name: ContainerName,
    ) -> Result<Arc<ContainerData>> {
        if self.manager.containers.contains_key(&name) {
            return Err(Error::AlreadyTracked(name));
        }

        let factory = Arc::clone(&self.manager.factory);
        let handler = {
            let name = name.clone();
            tokio::task::spawn_blocking(move || factory.new_handler(&name)).await?
        }
        .map_err(|source| Error::NewHandler {
            name: name.clone(),
            source,
        })?;

        let cont = Arc::new(ContainerData::new(
            name.clone(),
            handler,
            &self.manager.config,
        ));
        self.manager.containers.insert(name.clone(), Arc::clone(&cont));
        log::info!("Added container: {name}");

        cont.start().await;
        Ok(cont)
    }

    /// Unregisters the collector of `name` and stops its housekeeping.
    ///
    /// Waits up to [`DESTROY_JOIN_TIMEOUT`] for the housekeeping task to exit.
    /// A task stuck in a slow tick is left to finish on its own; it only
    /// writes to the unregistered collector.
    pub(crate) async fn destroy_container(&mut self, name: &ContainerName) -> Result<()> {
        let (_, cont) = self
            .manager
            .containers
            .remove(name)
            .ok_or_else(|| Error::ExpectedToExist(name.clone()))?;

        let joiner = tokio::spawn(async move { cont.stop_and_join().await });
        match tokio::time::timeout(DESTROY_JOIN_TIMEOUT, joiner).await {
            Ok(joined) => joined??,
            Err(_) => log::warn!(
                "Housekeeping for container `{name}` is busy, not waiting for it to stop"
            ),
        }
        log::info!("Destroyed container: {name}");
        Ok(())
    }

    /// Returns the containers that appeared and disappeared since the last pass.
    pub(crate) async fn containers_diff(
        &self,
    ) -> Result<(Vec<ContainerName>, Vec<ContainerName>)> {
        let root = self
            .manager
            .containers
            .get(ROOT_CONTAINER)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(Error::MissingRoot)?;

        let handler = root.handler();
        let mut live = tokio::task::spawn_blocking(move || {
            handler.list_containers(ListType::Recursive)
        })
        .await?
        .map_err(|source| Error::ListContainers {
            name: ContainerName::root(),
            source,
        })?;
        live.push(ContainerName::root());
        let live: HashSet<ContainerName> = live.into_iter().collect();

        let added = live
            .iter()
            .filter(|name| !self.manager.containers.contains_key(*name))
            .cloned()
            .collect();
        let removed = self
            .manager
            .containers
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|name| !live.contains(name))
            .collect();

        Ok((added, removed))
    }

    /// Runs one reconciliation pass.
    ///
    /// The pass stops at the first failing creation or destruction; changes
    /// applied before it are kept and the next pass picks up the rest.
    pub(crate) async fn detect_containers(&mut self) -> Result<()> {
        let (added, removed) = self.containers_diff().await?;

        for name in added {
            self.create_container(name.clone())
                .await
                .map_err(|source| Error::CreateContainer {
                    name,
                    source: Box::new(source),
                })?;
        }

        for name in removed {
            if let Err(source) = self.destroy_container(&name).await {
                return Err(Error::DestroyContainer {
                    name,
                    source: Box::new(source),
                });
            }
        }

        Ok(())
    }
}
