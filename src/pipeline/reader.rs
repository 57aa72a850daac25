//! Archive decode: gzip tar stream → one [`Message`] per regular entry.

use flate2::read::GzDecoder;
use log::debug;
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::Path;

use crossbeam_channel::Sender;

use crate::Message;
use crate::error::{BridgeError, SourceFailure};

use super::attrs::{XATTR_PREFIX, message_from_attrs};
use super::barrier::CompletionBarrier;

/// Stream the gzip tar in `reader` onto `tx`, in archive order. `source` only labels errors.
///
/// Each entry is read fully into memory, counted on `barrier`, then sent; the send blocks
/// while the queue is full. Returns the number of messages dispatched. The first decode or
/// read failure aborts the stream; messages already sent stay in flight and still need
/// their `done`.
pub fn unpack<R: Read>(
    source: &Path,
    reader: R,
    tx: &Sender<Message>,
    barrier: &CompletionBarrier,
) -> crate::Result<usize> {
    let decode = |e: io::Error| BridgeError::from_archive(source, e);

    let mut archive = tar::Archive::new(GzDecoder::new(SourceRead(reader)));
    let mut count = 0_usize;
    for entry in archive.entries().map_err(decode)? {
        let mut entry = entry.map_err(decode)?;
        if !entry.header().entry_type().is_file() {
            debug!(
                "{}: skipping non-file entry {}",
                source.display(),
                String::from_utf8_lossy(&entry.path_bytes())
            );
            continue;
        }
        let attrs = entry_attrs(&mut entry).map_err(decode)?;
        let mut body = Vec::new();
        entry.read_to_end(&mut body).map_err(decode)?;
        if body.len() as u64 != entry.size() {
            return Err(decode(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "entry {} truncated: {} of {} bytes",
                    String::from_utf8_lossy(&entry.path_bytes()),
                    body.len(),
                    entry.size()
                ),
            )));
        }

        barrier.add(1);
        if tx.send(message_from_attrs(body, attrs)).is_err() {
            barrier.done();
            return Err(BridgeError::QueueClosed);
        }
        count += 1;
    }
    Ok(count)
}

/// `SCHILY.xattr.*` PAX records of one entry, prefix stripped. Other PAX keys are ignored.
fn entry_attrs<R: Read>(entry: &mut tar::Entry<'_, R>) -> io::Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    if let Some(extensions) = entry.pax_extensions()? {
        for ext in extensions {
            let ext = ext?;
            let Ok(key) = ext.key() else { continue };
            if let Some(name) = key.strip_prefix(XATTR_PREFIX) {
                attrs.insert(
                    name.to_string(),
                    String::from_utf8_lossy(ext.value_bytes()).into_owned(),
                );
            }
        }
    }
    Ok(attrs)
}

/// Tags read failures of the archive source so they classify as I/O, not bad data.
struct SourceRead<R>(R);

impl<R: Read> Read for SourceRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf).map_err(|e| match e.kind() {
            io::ErrorKind::Interrupted => e,
            kind => io::Error::new(kind, SourceFailure(e)),
        })
    }
}
