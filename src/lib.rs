use std::sync::Arc;

/// Container Housekeeper: keeps one periodic stats collector per live container
/// and answers point-in-time queries about containers and the host machine.
///
/// The [`manager::Manager`] discovers containers through a
/// [`container::HandlerFactory`], tracks a bounded history of samples per
/// container and reconciles the tracked set with the containers on the host.
/// [`cgroup`] provides handlers backed by the cgroup v2 filesystem and
/// [`machine`] reads the host capacity from procfs.
pub mod cgroup;
pub mod config;
pub mod container;
pub mod error;
pub mod fsutil;
pub mod info;
pub mod machine;
pub mod manager;

/// Runs the container housekeeper until a fatal error occurs.
///
/// Reads the configuration from the environment, fetches the machine info and
/// starts the manager on the host's cgroup v2 hierarchy.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid configuration values in the environment.
/// - Failure to read the machine info from procfs.
/// - Failure to track the root container.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    log::debug!("Configuration: {config:?}");

    let machine = machine::ProcMachineInfo::new(&config.proc_root);
    let factory = Arc::new(cgroup::CgroupHandlerFactory::new(&config.cgroup_root));
    let manager = manager::Manager::new(&machine, factory, config.manager)?;

    manager.start().await?;
    Ok(())
}
