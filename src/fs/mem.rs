use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{FileKind, FileSystem};

#[derive(Clone, Debug)]
enum Node {
    Dir,
    File(Vec<u8>),
    /// Stand-in for symlinks, devices, sockets.
    Special,
}

/// In-memory filesystem. Clones share the same tree, so a test can keep one handle while
/// the pipeline owns another.
#[derive(Clone, Debug, Default)]
pub struct MemFs {
    nodes: Arc<Mutex<BTreeMap<PathBuf, Node>>>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

/// Empty parent (relative single component) and `/` are always present.
fn is_root(path: &Path) -> bool {
    path.as_os_str().is_empty() || path.parent().is_none()
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        // A panicking test thread must not poison the tree for the others.
        self.nodes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write `data` to `path`, creating parent directories first.
    pub fn add_file(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        self.write(path, &data.into())
    }

    /// Register a non-regular entry (behaves like a symlink or device node).
    pub fn add_special(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        self.lock().insert(path.to_path_buf(), Node::Special);
        Ok(())
    }

    /// Contents of a file, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().get(path.as_ref()) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }
}

impl FileSystem for MemFs {
    fn metadata(&self, path: &Path) -> io::Result<FileKind> {
        if is_root(path) {
            return Ok(FileKind::Dir);
        }
        match self.lock().get(path) {
            Some(Node::Dir) => Ok(FileKind::Dir),
            Some(Node::File(_)) => Ok(FileKind::File),
            Some(Node::Special) => Ok(FileKind::Other),
            None => Err(not_found(path)),
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        if self.metadata(path)? != FileKind::Dir {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", path.display()),
            ));
        }
        let nodes = self.lock();
        Ok(nodes
            .keys()
            .filter(|k| k.parent() == Some(path))
            .filter_map(|k| k.file_name().map(|n| n.to_os_string()))
            .collect())
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        match self.lock().get(path) {
            Some(Node::File(data)) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !is_root(parent)
            && self.metadata(parent)? != FileKind::Dir
        {
            return Err(not_found(parent));
        }
        let mut nodes = self.lock();
        if let Some(Node::Dir) = nodes.get(path) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            ));
        }
        nodes.insert(path.to_path_buf(), Node::File(data.to_vec()));
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.lock();
        let mut ancestors: Vec<&Path> = path.ancestors().filter(|p| !is_root(p)).collect();
        ancestors.reverse();
        for dir in ancestors {
            match nodes.get(dir) {
                Some(Node::Dir) => {}
                Some(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("not a directory: {}", dir.display()),
                    ));
                }
                None => {
                    nodes.insert(dir.to_path_buf(), Node::Dir);
                }
            }
        }
        Ok(())
    }
}
