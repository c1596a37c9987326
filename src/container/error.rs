use std::path::PathBuf;

/// Errors reported by container handlers and machine info providers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid container name: {0}")]
    InvalidContainerName(String),
    #[error("container `{0}` does not exist")]
    ContainerGone(String),
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: crate::cgroup::stats::StatParseError,
    },
    #[error("missing field `{field}` in `{path}`")]
    MissingField { field: &'static str, path: PathBuf },
    #[error("value of `{field}` in `{path}` is out of range")]
    OutOfRange { field: &'static str, path: PathBuf },
    #[error(transparent)]
    FileOpen(#[from] crate::fsutil::FileOpenError),
}

pub type Result<T> = std::result::Result<T, Error>;
