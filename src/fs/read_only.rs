use std::ffi::OsString;
use std::io::{self, Read};
use std::path::Path;

use super::{FileKind, FileSystem};

/// Wraps another filesystem; reads pass through, writes and mkdir fail with `PermissionDenied`.
#[derive(Clone, Debug)]
pub struct ReadOnlyFs<F> {
    inner: F,
}

impl<F: FileSystem> ReadOnlyFs<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

fn denied(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("read-only filesystem: {}", path.display()),
    )
}

impl<F: FileSystem> FileSystem for ReadOnlyFs<F> {
    fn metadata(&self, path: &Path) -> io::Result<FileKind> {
        self.inner.metadata(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        self.inner.read_dir(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        self.inner.open(path)
    }

    fn write(&self, path: &Path, _data: &[u8]) -> io::Result<()> {
        Err(denied(path))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        Err(denied(path))
    }
}
