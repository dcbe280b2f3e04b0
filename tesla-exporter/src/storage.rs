//! Durable file primitives shared by the token store and the vehicle data cache.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{info, warn};

/// Errors reading or writing a persisted file.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Path of the side file a write goes through before it is renamed into place.
fn side_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".new");
    PathBuf::from(name)
}

/// Replace `path` with `data` followed by a newline.
///
/// The content is written to `<path>.new` and renamed over `path`, so readers
/// see either the previous file or the complete new one.
pub fn write_atomic(path: &Path, data: &str) -> Result<(), StorageError> {
    info!(path = %path.display(), "Updating file");

    let tmp = side_path(path);
    let write_err = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut file = std::fs::File::create(&tmp).map_err(write_err)?;
    file.write_all(data.as_bytes()).map_err(write_err)?;
    file.write_all(b"\n").map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);

    std::fs::rename(&tmp, path).map_err(write_err)
}

/// Read a whole file as text.
pub fn read_to_string(path: &Path) -> Result<String, StorageError> {
    std::fs::read_to_string(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Modification time of `path`, or `None` if it cannot be determined.
pub fn file_age(path: &Path) -> Option<SystemTime> {
    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(mtime) => Some(mtime),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot stat file");
            None
        }
    }
}
