use crate::container::{self, ContainerName};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to get machine info: {0}")]
    MachineInfo(#[source] container::Error),
    #[error("unknown container `{0}`")]
    UnknownContainer(String),
    #[error("expected container `{0}` to exist during destroy")]
    ExpectedToExist(ContainerName),
    #[error("container `{0}` is already tracked")]
    AlreadyTracked(ContainerName),
    #[error("failed to find root container while checking for new containers")]
    MissingRoot,
    #[error("manager is already started")]
    AlreadyStarted,
    #[error("failed to create handler for container `{name}`: {source}")]
    NewHandler {
        name: ContainerName,
        #[source]
        source: container::Error,
    },
    #[error("failed to update stats for container `{name}`: {source}")]
    UpdateStats {
        name: ContainerName,
        #[source]
        source: container::Error,
    },
    #[error("failed to update spec for container `{name}`: {source}")]
    UpdateSpec {
        name: ContainerName,
        #[source]
        source: container::Error,
    },
    #[error("failed to list subcontainers of `{name}`: {source}")]
    ListContainers {
        name: ContainerName,
        #[source]
        source: container::Error,
    },
    #[error("failed to create existing container `{name}`: {source}")]
    CreateContainer {
        name: ContainerName,
        #[source]
        source: Box<Error>,
    },
    #[error("failed to destroy existing container `{name}`: {source}")]
    DestroyContainer {
        name: ContainerName,
        #[source]
        source: Box<Error>,
    },
    #[error("background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
