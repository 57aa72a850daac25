//! Error taxonomy for the bridge. Library calls return [`BridgeError`]; the binary wraps it in `anyhow`.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Input path (or a queued archive) does not exist.
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Malformed gzip or tar content.
    #[error("decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("io {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Directory create or file write denied (read-only fs, missing rights).
    #[error("permission denied: {}", path.display())]
    Permission { path: PathBuf },

    /// The far end of the message queue went away while dispatching.
    #[error("message queue closed by the other side")]
    QueueClosed,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("transport: {0}")]
    Transport(String),

    /// Best-effort input run: some archives failed, the rest were sent.
    #[error("{failed} archive(s) failed; first: {first}")]
    Aggregate {
        failed: usize,
        first: Box<BridgeError>,
    },
}

impl BridgeError {
    /// Classify an io error by kind; `NotFound` and `PermissionDenied` get their own variants.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => BridgeError::NotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
                BridgeError::Permission {
                    path: path.to_path_buf(),
                }
            }
            _ => BridgeError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Errors surfaced while walking a tar stream. Failures of the underlying source keep
    /// their io classification; everything the gzip/tar layers report becomes `Decode`
    /// (tar signals malformed headers with `ErrorKind::Other`).
    pub fn from_archive(path: &Path, err: io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<SourceFailure>()) {
            let kind = err.kind();
            let source = err
                .into_inner()
                .and_then(|inner| inner.downcast::<SourceFailure>().ok())
                .map_or_else(|| io::Error::from(kind), |failure| failure.0);
            return BridgeError::from_io(path, source);
        }
        match err.kind() {
            io::ErrorKind::InvalidData
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::Other => BridgeError::Decode {
                path: path.to_path_buf(),
                source: err,
            },
            _ => BridgeError::from_io(path, err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BridgeError::NotFound { .. })
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, BridgeError::Permission { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, BridgeError::Decode { .. })
    }
}

/// Read failure of the raw archive source, as opposed to bad gzip/tar content.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub(crate) struct SourceFailure(pub(crate) io::Error);
