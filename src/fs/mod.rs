//! Filesystem capability. Every component that touches disk takes an `Arc<dyn FileSystem>`
//! at construction; there is no process-wide handle.

mod mem;
mod os;
mod read_only;

pub use mem::MemFs;
pub use os::OsFs;
pub use read_only::ReadOnlyFs;

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

/// What a path points at. Symlinks are not followed and report [`FileKind::Other`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Dir,
    File,
    Other,
}

/// Minimal stat/read/write/mkdir surface the pipeline needs.
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    fn metadata(&self, path: &Path) -> io::Result<FileKind>;

    /// Names of the immediate children of `path`, sorted by name.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// Create or truncate `path` with `data`. The parent directory must exist.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }
}

/// Shared handle passed into constructors.
pub type SharedFs = Arc<dyn FileSystem>;

/// Handle to the real filesystem.
pub fn os() -> SharedFs {
    Arc::new(OsFs)
}
