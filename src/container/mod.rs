use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

mod error;
mod handler;

pub use error::{Error, Result};
pub use handler::{ContainerHandler, HandlerFactory, ListType};

/// The maximum allowed length for a [`ContainerName`].
const CONTAINER_NAME_MAX_LEN: usize = 4096;

/// Name of the container representing the whole host.
pub const ROOT_CONTAINER: &str = "/";

/// A validated, absolute container name such as `/system.slice/docker.service`.
///
/// # Examples
///
/// ```
/// # use container_housekeeper::container::ContainerName;
/// let name = ContainerName::new("/docker/abc123").unwrap();
/// assert_eq!(name.as_ref(), "/docker/abc123");
/// assert!(!name.is_root());
/// assert!(ContainerName::new("docker").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerName(Arc<str>);

impl ContainerName {
    /// Creates a new `ContainerName` from the given raw name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerName`] if the name is not absolute or exceeds
    /// [`CONTAINER_NAME_MAX_LEN`].
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if !src.starts_with('/') || src.len() > CONTAINER_NAME_MAX_LEN {
            return Err(Error::InvalidContainerName(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    /// The root container `/`.
    pub fn root() -> Self {
        Self(ROOT_CONTAINER.into())
    }

    pub fn is_root(&self) -> bool {
        &*self.0 == ROOT_CONTAINER
    }

    /// Returns the name of the direct child `child` of this container.
    pub fn join(&self, child: &str) -> Result<Self> {
        if self.is_root() {
            Self::new(format!("/{child}"))
        } else {
            Self::new(format!("{}/{child}", self.0))
        }
    }

    /// Path of this container relative to the hierarchy root, e.g. `a/b` for `/a/b`.
    pub fn relative_path(&self) -> &str {
        self.0.trim_start_matches('/')
    }
}

impl AsRef<str> for ContainerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for ContainerName {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
