//! Output directory preparation.

use log::info;
use std::path::Path;

use crate::error::BridgeError;
use crate::fs::{FileKind, FileSystem};

/// Create `path` (and missing parents) unless it already exists. Idempotent.
pub fn ensure(fs: &dyn FileSystem, path: &Path) -> crate::Result<()> {
    match fs.metadata(path) {
        Ok(FileKind::Dir) => return Ok(()),
        Ok(_) => {
            return Err(BridgeError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "exists and is not a directory",
                ),
            });
        }
        Err(_) => {}
    }
    fs.create_dir_all(path)
        .map_err(|e| BridgeError::from_io(path, e))?;
    info!("Created missing directory: {}", path.display());
    Ok(())
}
