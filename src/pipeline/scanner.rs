//! Input enumeration: a file or the immediate entries of a directory.

use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::error::BridgeError;
use crate::fs::{FileKind, FileSystem};

/// Ordered list of archive paths. Built once, never modified.
pub type WorkQueue = Vec<PathBuf>;

/// Build the work queue for `path`.
///
/// - directory: every immediate entry, in the filesystem's listing order, joined onto `path`
/// - regular file: just `path`
/// - anything else (symlink, device, ...): empty queue, not an error
pub fn scan(fs: &dyn FileSystem, path: &Path) -> crate::Result<WorkQueue> {
    let kind = fs
        .metadata(path)
        .map_err(|e| BridgeError::from_io(path, e))?;
    let queue = match kind {
        FileKind::Dir => {
            let names = fs
                .read_dir(path)
                .map_err(|e| BridgeError::from_io(path, e))?;
            info!("Found {} file(s) in {}", names.len(), path.display());
            names.into_iter().map(|n| path.join(n)).collect()
        }
        FileKind::File => vec![path.to_path_buf()],
        FileKind::Other => {
            debug!(
                "{} is neither a file nor a directory; nothing to read",
                path.display()
            );
            Vec::new()
        }
    };
    Ok(queue)
}
