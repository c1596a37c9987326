use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;

use crate::config::ManagerConfig;
use crate::container::{self, ContainerHandler, ContainerName, ListType};
use crate::error::ResultOkLogExt;
use crate::info::{
    ContainerInfo, ContainerSpec, ContainerStats, ContainerStatsSample, ContainerStatsSummary,
};

use super::history::StatsHistory;
use super::{Error, Result};

/// Housekeeping ticks taking at least this long are reported.
const SLOW_HOUSEKEEPING_THRESHOLD: Duration = Duration::from_millis(120);

/// Lifecycle of a collector's housekeeping task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HousekeepingStatus {
    Created,
    Running,
    Stopping,
    Stopped,
}

#[derive(Debug)]
struct ContainerState {
    spec: Option<ContainerSpec>,
    subcontainers: Vec<ContainerName>,
    summary: Option<ContainerStatsSummary>,
    history: StatsHistory,
}

/// The part of a collector shared with its housekeeping task.
struct Shared {
    name: ContainerName,
    handler: Arc<dyn ContainerHandler>,
    state: Mutex<ContainerState>,
}

enum Task {
    Idle,
    Starting,
    Running(JoinHandle<()>),
    Joining(AbortHandle),
    Joined,
}

/// Collector of a single container.
///
/// Owns the container's latest spec, subcontainers, stats summary and a bounded
/// stats history, refreshed by a dedicated housekeeping task.
pub struct ContainerData {
    shared: Arc<Shared>,
    housekeeping_interval: Duration,
    stop_tx: watch::Sender<bool>,
    task: Mutex<Task>,
}

impl fmt::Debug for ContainerData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerData")
            .field("name", &self.shared.name)
            .field("housekeeping_interval", &self.housekeeping_interval)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl ContainerData {
    pub fn new(
        name: ContainerName,
        handler: Arc<dyn ContainerHandler>,
        config: &ManagerConfig,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                name,
                handler,
                state: Mutex::new(ContainerState {
                    spec: None,
                    subcontainers: Vec::new(),
                    summary: None,
                    history: StatsHistory::new(config.history_len),
                }),
            }),
            housekeeping_interval: config.housekeeping_interval,
            stop_tx,
            task: Mutex::new(Task::Idle),
        }
    }

    pub fn name(&self) -> &ContainerName {
        &self.shared.name
    }

    pub(crate) fn handler(&self) -> Arc<dyn ContainerHandler> {
        Arc::clone(&self.shared.handler)
    }

    /// Refreshes the stats once, then spawns the periodic housekeeping task.
    ///
    /// Refresh failures are logged. Starting a collector twice has no effect.
    pub async fn start(&self) {
        {
            let mut task = self.lock_task();
            if !matches!(*task, Task::Idle) {
                log::warn!(
                    "Housekeeping for container `{}` was already started",
                    self.shared.name
                );
                return;
            }
            *task = Task::Starting;
        }

        // Force the first update so the collector has data before the first tick.
        self.shared.housekeeping_tick().await;
        log::info!("Start housekeeping for container `{}`", self.shared.name);

        let handle = tokio::spawn(housekeeping(
            Arc::clone(&self.shared),
            self.housekeeping_interval,
            self.stop_tx.subscribe(),
        ));
        *self.lock_task() = Task::Running(handle);
    }

    /// Asks the housekeeping task to exit without waiting for it.
    ///
    /// A tick that is already in flight still completes.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Asks the housekeeping task to exit and waits until it has.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskJoin`] if the task panicked.
    pub async fn stop_and_join(&self) -> Result<()> {
        self.stop();
        let handle = {
            let mut task = self.lock_task();
            match std::mem::replace(&mut *task, Task::Joined) {
                Task::Running(handle) => {
                    *task = Task::Joining(handle.abort_handle());
                    handle
                }
                Task::Joining(abort) => {
                    // Someone else owns the handle; keep reporting progress.
                    *task = Task::Joining(abort);
                    return Ok(());
                }
                _ => return Ok(()),
            }
        };

        let joined = handle.await;
        *self.lock_task() = Task::Joined;
        joined?;
        Ok(())
    }

    pub fn status(&self) -> HousekeepingStatus {
        let stopping = *self.stop_tx.borrow();
        match &*self.lock_task() {
            Task::Idle => HousekeepingStatus::Created,
            Task::Running(handle) if handle.is_finished() => HousekeepingStatus::Stopped,
            Task::Joining(abort) if abort.is_finished() => HousekeepingStatus::Stopped,
            Task::Joining(_) => HousekeepingStatus::Stopping,
            Task::Starting | Task::Running(_) if stopping => HousekeepingStatus::Stopping,
            Task::Starting | Task::Running(_) => HousekeepingStatus::Running,
            Task::Joined => HousekeepingStatus::Stopped,
        }
    }

    /// Refreshes spec and subcontainers and returns a copy of the collector's state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpdateSpec`] or [`Error::ListContainers`] if either refresh
    /// fails; no snapshot is produced in that case.
    pub async fn get_info(&self) -> Result<ContainerInfo> {
        let handler = self.handler();
        let name = self.shared.name.clone();
        let (spec, subcontainers) = tokio::task::spawn_blocking(move || -> Result<_> {
            let spec = handler.spec().map_err(|source| Error::UpdateSpec {
                name: name.clone(),
                source,
            })?;
            let subcontainers = handler
                .list_containers(ListType::SelfOnly)
                .map_err(|source| Error::ListContainers { name, source })?;
            Ok((spec, subcontainers))
        })
        .await??;

        let mut state = self.shared.lock_state();
        state.spec = Some(spec.clone());
        state.subcontainers = subcontainers.clone();
        Ok(ContainerInfo {
            name: self.shared.name.clone(),
            subcontainers,
            spec,
            stats: state.history.to_vec(),
            stats_summary: state.summary,
        })
    }

    /// Runs one housekeeping tick on the caller's task.
    #[cfg(test)]
    pub(crate) async fn housekeeping_tick(&self) {
        self.shared.housekeeping_tick().await;
    }

    fn lock_task(&self) -> MutexGuard<'_, Task> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, ContainerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn housekeeping_tick(&self) {
        self.update_stats().await.ok_log();
    }

    async fn update_stats(&self) -> Result<()> {
        let handler = Arc::clone(&self.handler);
        let reading = tokio::task::spawn_blocking(
            move || -> container::Result<Option<(ContainerStats, ContainerStatsSummary)>> {
                let Some(stats) = handler.stats()? else {
                    return Ok(None);
                };
                let summary = handler.stats_summary()?;
                Ok(Some((stats, summary)))
            },
        )
        .await?
        .map_err(|source| Error::UpdateStats {
            name: self.name.clone(),
            source,
        })?;

        let Some((stats, summary)) = reading else {
            return Ok(());
        };
        let timestamp = SystemTime::now();

        let mut state = self.lock_state();
        state.history.push(ContainerStatsSample { timestamp, stats });
        state.summary = Some(summary);
        Ok(())
    }
}

async fn housekeeping(
    shared: Arc<Shared>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; start() already refreshed.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            // The returned `Ref` must not outlive the branch.
            _ = async { stop_rx.wait_for(|stopped| *stopped).await.is_ok() } => break,
            _ = ticker.tick() => {
                let start = Instant::now();
                shared.housekeeping_tick().await;

                let duration = start.elapsed();
                if duration >= SLOW_HOUSEKEEPING_THRESHOLD {
                    log::warn!("Housekeeping({}) took {:?}", shared.name, duration);
                }
            }
        }
    }
    log::debug!("Stopped housekeeping for container `{}`", shared.name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::testing::{FakeHost, StatsBehavior, usage_seqs};

    fn config(history_len: usize) -> ManagerConfig {
        ManagerConfig {
            history_len,
            housekeeping_interval: Duration::from_secs(3600),
            global_housekeeping_interval: Duration::from_secs(3600),
        }
    }

    fn collector(host: &Arc<FakeHost>, name: &str, history_len: usize) -> ContainerData {
        let name = ContainerName::new(name).unwrap();
        ContainerData::new(name.clone(), host.handler(&name), &config(history_len))
    }

    #[test]
    fn test_housekeeping_task_is_send() {
        fn assert_send<T: Send>(_: &T) {}

        let host = FakeHost::new();
        let cont = collector(&host, "/a", 1);
        let task = housekeeping(
            Arc::clone(&cont.shared),
            Duration::from_secs(1),
            cont.stop_tx.subscribe(),
        );
        assert_send(&task);
    }

    #[tokio::test]
    async fn test_history_keeps_most_recent_samples() {
        let host = FakeHost::new();
        host.add("/a");
        let cont = collector(&host, "/a", 3);

        for _ in 0..4 {
            cont.housekeeping_tick().await;
        }

        let info = cont.get_info().await.unwrap();
        assert_eq!(usage_seqs(&info), vec![2, 3, 4]);
        assert!(
            info.stats
                .windows(2)
                .all(|pair| pair[0].timestamp <= pair[1].timestamp)
        );
        assert_eq!(info.stats_summary.unwrap().samples, 4);
    }

    #[tokio::test]
    async fn test_absent_sample_is_a_no_op() {
        let host = FakeHost::new();
        host.add("/a");
        let cont = collector(&host, "/a", 5);

        cont.housekeeping_tick().await;
        cont.housekeeping_tick().await;
        let before = cont.get_info().await.unwrap();

        host.set_behavior("/a", StatsBehavior::Absent);
        cont.housekeeping_tick().await;
        let after = cont.get_info().await.unwrap();

        assert_eq!(after.stats.len(), 2);
        assert_eq!(after.stats, before.stats);
        assert_eq!(after.stats_summary, before.stats_summary);
    }

    #[tokio::test]
    async fn test_failed_tick_keeps_collecting() {
        let host = FakeHost::new();
        host.add("/a");
        let cont = collector(&host, "/a", 5);

        host.set_behavior("/a", StatsBehavior::Fail);
        cont.housekeeping_tick().await;
        assert!(cont.get_info().await.unwrap().stats.is_empty());

        host.set_behavior("/a", StatsBehavior::Samples);
        cont.housekeeping_tick().await;
        assert_eq!(cont.get_info().await.unwrap().stats.len(), 1);
    }

    #[tokio::test]
    async fn test_get_info_fails_without_snapshot_on_spec_error() {
        let host = FakeHost::new();
        host.add("/a");
        let cont = collector(&host, "/a", 5);
        host.fail_spec("/a");

        let err = cont.get_info().await.unwrap_err();
        assert!(matches!(err, Error::UpdateSpec { .. }));
    }

    #[tokio::test]
    async fn test_get_info_lists_direct_children() {
        let host = FakeHost::new();
        host.add("/a");
        host.add("/a/x");
        host.add("/a/x/deep");
        host.add("/b");
        let cont = collector(&host, "/a", 5);

        let info = cont.get_info().await.unwrap();
        assert_eq!(info.subcontainers, vec![ContainerName::new("/a/x").unwrap()]);
    }

    #[tokio::test]
    async fn test_start_refreshes_immediately() {
        let host = FakeHost::new();
        host.add("/a");
        let cont = collector(&host, "/a", 5);
        assert_eq!(cont.status(), HousekeepingStatus::Created);

        cont.start().await;
        assert_eq!(cont.status(), HousekeepingStatus::Running);
        assert_eq!(cont.get_info().await.unwrap().stats.len(), 1);

        // A second start neither refreshes nor spawns another task.
        cont.start().await;
        assert_eq!(cont.get_info().await.unwrap().stats.len(), 1);

        cont.stop_and_join().await.unwrap();
        assert_eq!(cont.status(), HousekeepingStatus::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_ticks_after_stop_and_join() {
        let host = FakeHost::new();
        host.add("/a");
        let name = ContainerName::new("/a").unwrap();
        let cont = ContainerData::new(
            name.clone(),
            host.handler(&name),
            &ManagerConfig {
                history_len: 1000,
                housekeeping_interval: Duration::from_millis(5),
                ..ManagerConfig::default()
            },
        );

        cont.start().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        cont.stop_and_join().await.unwrap();

        let collected = cont.get_info().await.unwrap().stats.len();
        assert!(collected > 1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cont.get_info().await.unwrap().stats.len(), collected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_join_reports_stopping_until_tick_ends() {
        let host = FakeHost::new();
        host.add("/a");
        let name = ContainerName::new("/a").unwrap();
        let cont = Arc::new(ContainerData::new(
            name.clone(),
            host.handler(&name),
            &ManagerConfig {
                housekeeping_interval: Duration::from_millis(5),
                ..ManagerConfig::default()
            },
        ));
        cont.start().await;
        host.set_behavior("/a", StatsBehavior::Slow(Duration::from_millis(300)));
        // Let the task enter a slow tick.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let joined =
            tokio::time::timeout(Duration::from_millis(20), cont.stop_and_join()).await;
        assert!(joined.is_err());
        assert_eq!(cont.status(), HousekeepingStatus::Stopping);

        let deadline = Instant::now() + Duration::from_secs(5);
        while cont.status() != HousekeepingStatus::Stopped {
            assert!(Instant::now() < deadline, "housekeeping did not stop");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_is_eventually_observed() {
        let host = FakeHost::new();
        host.add("/a");
        let name = ContainerName::new("/a").unwrap();
        let cont = ContainerData::new(
            name.clone(),
            host.handler(&name),
            &ManagerConfig {
                housekeeping_interval: Duration::from_millis(5),
                ..ManagerConfig::default()
            },
        );

        cont.start().await;
        cont.stop();
        assert_ne!(cont.status(), HousekeepingStatus::Running);

        let deadline = Instant::now() + Duration::from_secs(5);
        while cont.status() != HousekeepingStatus::Stopped {
            assert!(Instant::now() < deadline, "housekeeping did not stop");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
