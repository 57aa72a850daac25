//! Batch encode: message stream → size-bounded gzip tar files, one [`Verify`] per file.

use crossbeam_channel::{Receiver, Sender};
use flate2::Compression;
use flate2::write::GzEncoder;
use log::{debug, info};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tar::{Builder, EntryType, Header};

use crate::error::BridgeError;
use crate::fs::FileSystem;
use crate::{BatchRef, Message, Verify};

use super::attrs::to_pax_records;

/// Hex chars of the blake3 digest kept in batch file names.
const DIGEST_LEN: usize = 16;

/// Name of the `index`-th entry inside a batch.
pub fn entry_name(index: usize) -> String {
    format!("message-{index:06}")
}

/// Serialize `messages` as gzip(tar). Routing key and headers go into PAX attributes.
pub fn encode_batch(messages: &[Message]) -> io::Result<Vec<u8>> {
    let mtime = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut tar = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (index, message) in messages.iter().enumerate() {
        let records = to_pax_records(message)?;
        if !records.is_empty() {
            tar.append_pax_extensions(records.iter().map(|(k, v)| (k.as_str(), v.as_slice())))?;
        }
        let mut header = Header::new_ustar();
        header.set_path(entry_name(index))?;
        header.set_entry_type(EntryType::Regular);
        header.set_size(message.body.len() as u64);
        header.set_mode(0o600);
        header.set_mtime(mtime);
        header.set_cksum();
        tar.append(&header, message.body.as_slice())?;
    }
    tar.into_inner()?.finish()
}

/// Groups messages into batches of at most `batch_size` and writes each as its own file.
#[derive(Debug)]
pub struct TarballBuilder {
    batch_size: usize,
    sequence: u64,
}

impl TarballBuilder {
    pub fn new(batch_size: usize) -> crate::Result<Self> {
        if batch_size == 0 {
            return Err(BridgeError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        Ok(Self {
            batch_size,
            sequence: 0,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Consume `rx` until it closes, flushing a batch whenever it fills and once more for a
    /// non-empty remainder. Returns the number of batch files written.
    ///
    /// A failed write sends `Verify { success: false }` and returns the error at once; files
    /// from earlier batches stay on disk.
    pub fn pack(
        &mut self,
        rx: &Receiver<Message>,
        fs: &dyn FileSystem,
        out_dir: &Path,
        verify: &Sender<Verify>,
    ) -> crate::Result<usize> {
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut written = 0_usize;
        for message in rx.iter() {
            batch.push(message);
            if batch.len() == self.batch_size {
                self.flush(&mut batch, fs, out_dir, verify)?;
                written += 1;
            }
        }
        if !batch.is_empty() {
            self.flush(&mut batch, fs, out_dir, verify)?;
            written += 1;
        }
        info!("Wrote {} batch file(s) to {}", written, out_dir.display());
        Ok(written)
    }

    /// Next unused file name for `bytes`. The sequence number never repeats within a builder;
    /// the digest separates builders, and existing files are never overwritten.
    fn next_path(&mut self, fs: &dyn FileSystem, out_dir: &Path, bytes: &[u8]) -> PathBuf {
        let hex = blake3::hash(bytes).to_hex();
        let digest = &hex.as_str()[..DIGEST_LEN];
        loop {
            self.sequence += 1;
            let path = out_dir.join(format!("batch-{:06}-{}.tgz", self.sequence, digest));
            if !fs.exists(&path) {
                return path;
            }
        }
    }

    fn flush(
        &mut self,
        batch: &mut Vec<Message>,
        fs: &dyn FileSystem,
        out_dir: &Path,
        verify: &Sender<Verify>,
    ) -> crate::Result<()> {
        let last_delivery_tag = batch.last().and_then(|m| m.delivery_tag);
        let encoded = encode_batch(batch);
        let (path, result) = match encoded {
            Ok(bytes) => {
                let path = self.next_path(fs, out_dir, &bytes);
                let result = fs
                    .write(&path, &bytes)
                    .map(|()| bytes.len())
                    .map_err(|e| BridgeError::from_io(&path, e));
                (path, result)
            }
            Err(e) => {
                self.sequence += 1;
                (
                    out_dir.to_path_buf(),
                    Err(BridgeError::Io {
                        path: out_dir.to_path_buf(),
                        source: e,
                    }),
                )
            }
        };

        let batch_ref = BatchRef {
            sequence: self.sequence,
            file: path,
            message_count: batch.len(),
            last_delivery_tag,
            multiple: last_delivery_tag.is_some(),
        };
        batch.clear();

        let (record, outcome) = match result {
            Ok(len) => {
                info!(
                    "Wrote {} bytes ({} message(s)) to {}",
                    len,
                    batch_ref.message_count,
                    batch_ref.file.display()
                );
                (Verify::ok(batch_ref), Ok(()))
            }
            Err(err) => (Verify::failed(batch_ref, &err), Err(err)),
        };
        if verify.send(record).is_err() {
            debug!("verify receiver gone; batch result not reported");
        }
        outcome
    }
}
