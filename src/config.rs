//! Runtime configuration.
//!
//! [`ManagerConfig`] holds the tunables of the housekeeping engine and is passed
//! explicitly into the manager; [`Config`] adds the host paths used by the
//! binary and is read from the environment.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Samples retained per container when `HISTORY_DURATION` is not set.
pub const DEFAULT_HISTORY_LEN: usize = 60;
/// Upper bound accepted for `HISTORY_DURATION`.
pub const MAX_HISTORY_LEN: usize = 86_400;
pub const DEFAULT_HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_GLOBAL_HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value for `{var}`: `{value}`")]
    InvalidValue { var: &'static str, value: String },
    #[error("`{0}` must be greater than zero")]
    ZeroInterval(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Tunables of the container manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Number of stats samples retained per container.
    pub history_len: usize,
    /// Interval of each container's stats refresh.
    pub housekeeping_interval: Duration,
    /// Interval of the container discovery pass.
    pub global_housekeeping_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            history_len: DEFAULT_HISTORY_LEN,
            housekeeping_interval: DEFAULT_HOUSEKEEPING_INTERVAL,
            global_housekeeping_interval: DEFAULT_GLOBAL_HOUSEKEEPING_INTERVAL,
        }
    }
}

/// Full configuration of the agent binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub manager: ManagerConfig,
    /// Mount point of the cgroup v2 hierarchy.
    pub cgroup_root: PathBuf,
    /// Mount point of procfs.
    pub proc_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manager: ManagerConfig::default(),
            cgroup_root: PathBuf::from("/sys/fs/cgroup"),
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Recognized variables: `HISTORY_DURATION`, `HOUSEKEEPING_INTERVAL_MS`,
    /// `GLOBAL_HOUSEKEEPING_INTERVAL_MS`, `CGROUP_ROOT` and `PROC_ROOT`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a numeric variable cannot be parsed or
    /// `HISTORY_DURATION` exceeds [`MAX_HISTORY_LEN`], and [`Error::ZeroInterval`]
    /// if an interval is zero.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var_os(var))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup("HISTORY_DURATION") {
            config.manager.history_len = parse_history_len("HISTORY_DURATION", value)?;
        }
        if let Some(value) = lookup("HOUSEKEEPING_INTERVAL_MS") {
            config.manager.housekeeping_interval =
                parse_interval("HOUSEKEEPING_INTERVAL_MS", value)?;
        }
        if let Some(value) = lookup("GLOBAL_HOUSEKEEPING_INTERVAL_MS") {
            config.manager.global_housekeeping_interval =
                parse_interval("GLOBAL_HOUSEKEEPING_INTERVAL_MS", value)?;
        }
        if let Some(value) = lookup("CGROUP_ROOT") {
            config.cgroup_root = PathBuf::from(value);
        }
        if let Some(value) = lookup("PROC_ROOT") {
            config.proc_root = PathBuf::from(value);
        }

        Ok(config)
    }
}

fn parse_number(var: &'static str, value: OsString) -> Result<u64> {
    let value = value.to_string_lossy();
    value.trim().parse::<u64>().map_err(|_| Error::InvalidValue {
        var,
        value: value.into_owned(),
    })
}

fn parse_history_len(var: &'static str, value: OsString) -> Result<usize> {
    let raw = value.to_string_lossy();
    match raw.trim().parse::<usize>() {
        Ok(len) if len <= MAX_HISTORY_LEN => Ok(len),
        _ => Err(Error::InvalidValue {
            var,
            value: raw.into_owned(),
        }),
    }
}

fn parse_interval(var: &'static str, value: OsString) -> Result<Duration> {
    match parse_number(var, value)? {
        0 => Err(Error::ZeroInterval(var)),
        ms => Ok(Duration::from_millis(ms)),
    }
}
