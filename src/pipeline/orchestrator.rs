//! Input and output drivers: the per-invocation loops around reader, barrier and encoder.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::error::BridgeError;
use crate::fs::SharedFs;
use crate::{FailurePolicy, Message, Verify};

use super::barrier::CompletionBarrier;
use super::output::ensure;
use super::reader::unpack;
use super::scanner::{WorkQueue, scan};
use super::writer::TarballBuilder;

/// Archive source for input mode: the scanned work queue plus the filesystem it lives on.
#[derive(Debug)]
pub struct InputPath {
    fs: SharedFs,
    queue: WorkQueue,
    policy: FailurePolicy,
}

impl InputPath {
    /// Scan `path` into a work queue. Fails with `NotFound` when `path` does not exist.
    pub fn new(fs: SharedFs, path: &Path) -> crate::Result<Self> {
        let queue = scan(fs.as_ref(), path)?;
        Ok(Self {
            fs,
            queue,
            policy: FailurePolicy::default(),
        })
    }

    /// Use an explicit queue instead of scanning.
    pub fn from_queue(fs: SharedFs, queue: WorkQueue) -> Self {
        Self {
            fs,
            queue,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn queue(&self) -> &[PathBuf] {
        &self.queue
    }

    /// Unpack every queued archive onto `tx`, in queue order, then wait on `barrier` until the
    /// consumer has marked every message done, and close the queue by dropping `tx`.
    ///
    /// The consumer must call `barrier.done()` once per received message or this never returns.
    /// On an archive failure the barrier is still drained and the queue still closed before
    /// the error is returned. If the consumer dropped its end, there is nobody left to
    /// acknowledge, so the wait is skipped.
    pub fn send(&self, tx: Sender<Message>, barrier: &CompletionBarrier) -> crate::Result<usize> {
        let mut total = 0_usize;
        let mut failures: Vec<BridgeError> = Vec::new();
        let mut consumer_gone = false;

        for file in &self.queue {
            match self.send_one(file, &tx, barrier) {
                Ok(n) => {
                    info!("Extracted {} message(s) from tarball: {}", n, file.display());
                    total += n;
                }
                Err(BridgeError::QueueClosed) => {
                    consumer_gone = true;
                    failures.push(BridgeError::QueueClosed);
                    break;
                }
                Err(e) => {
                    warn!("Failed to unpack {}: {}", file.display(), e);
                    failures.push(e);
                    if self.policy == FailurePolicy::FailFast {
                        break;
                    }
                }
            }
        }

        if !consumer_gone {
            debug!("waiting for {} unacknowledged message(s)", barrier.pending());
            barrier.wait();
        }
        drop(tx);
        info!("Total {} message(s) from tarballs", total);

        collapse_failures(failures).map(|()| total)
    }

    /// One archive: the file handle lives only for this call.
    fn send_one(
        &self,
        file: &Path,
        tx: &Sender<Message>,
        barrier: &CompletionBarrier,
    ) -> crate::Result<usize> {
        let reader = self
            .fs
            .open(file)
            .map_err(|e| BridgeError::from_io(file, e))?;
        unpack(file, reader, tx, barrier)
    }
}

fn collapse_failures(mut failures: Vec<BridgeError>) -> crate::Result<()> {
    match failures.len() {
        0 => Ok(()),
        1 => Err(failures.remove(0)),
        n => Err(BridgeError::Aggregate {
            failed: n,
            first: Box::new(failures.remove(0)),
        }),
    }
}

/// Destination directory for output mode.
#[derive(Debug)]
pub struct OutputPath {
    fs: SharedFs,
    dir: PathBuf,
    batch_size: usize,
}

impl OutputPath {
    /// Validate `batch_size` and make sure `dir` exists.
    pub fn new(fs: SharedFs, dir: &Path, batch_size: usize) -> crate::Result<Self> {
        if batch_size == 0 {
            return Err(BridgeError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        ensure(fs.as_ref(), dir)?;
        Ok(Self {
            fs,
            dir: dir.to_path_buf(),
            batch_size,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Pack everything arriving on `rx` into batch files. Returns the number of files written.
    pub fn receive(&self, rx: &Receiver<Message>, verify: &Sender<Verify>) -> crate::Result<usize> {
        TarballBuilder::new(self.batch_size)?.pack(rx, self.fs.as_ref(), &self.dir, verify)
    }
}
