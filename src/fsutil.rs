use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use container_housekeeper::fsutil;
/// let reader = fsutil::open_file_reader("/proc/meminfo")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Like [`open_file_reader`], but a file that does not exist yields `Ok(None)`.
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file exists but cannot be opened.
pub fn open_optional_file_reader(
    path: impl AsRef<Path>,
) -> Result<Option<BufReader<File>>, FileOpenError> {
    match open_file_reader(path) {
        Ok(reader) => Ok(Some(reader)),
        Err(err) if err.source.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}
