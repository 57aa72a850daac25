//! Transport boundary and the newline-delimited JSON adapter used by the CLI.
//!
//! A real broker client implements [`Transport`]; the pipeline only needs `send` for input
//! mode and `receive` for output mode.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use std::io::{BufRead, Write};

use crate::error::BridgeError;
use crate::pipeline::CompletionBarrier;
use crate::{Message, Verify};

pub trait Transport {
    /// Publish one message.
    fn send(&mut self, message: Message) -> crate::Result<()>;

    /// Next delivered message; `None` once the source is exhausted.
    fn receive(&mut self) -> crate::Result<Option<Message>>;

    /// Settle deliveries confirmed by a batch. Default: nothing to settle.
    fn confirm(&mut self, _verify: &Verify) -> crate::Result<()> {
        Ok(())
    }
}

/// One JSON object per line: `{"body": <base64>, "routing_key": .., "headers": {..}}`.
///
/// `receive` stamps sequential delivery tags (starting at 1) on messages that arrive
/// without one, the way a broker numbers deliveries on a channel.
pub struct NdjsonTransport<R, W> {
    reader: R,
    writer: W,
    line: String,
    next_tag: u64,
}

impl<R: BufRead, W: Write> NdjsonTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: String::new(),
            next_tag: 1,
        }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

fn transport_err(e: impl std::fmt::Display) -> BridgeError {
    BridgeError::Transport(e.to_string())
}

impl<R: BufRead, W: Write> Transport for NdjsonTransport<R, W> {
    fn send(&mut self, message: Message) -> crate::Result<()> {
        serde_json::to_writer(&mut self.writer, &message).map_err(transport_err)?;
        self.writer.write_all(b"\n").map_err(transport_err)?;
        self.writer.flush().map_err(transport_err)
    }

    fn receive(&mut self) -> crate::Result<Option<Message>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line).map_err(transport_err)? == 0 {
                return Ok(None);
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut message: Message = serde_json::from_str(trimmed).map_err(transport_err)?;
            let tag = *message.delivery_tag.get_or_insert(self.next_tag);
            self.next_tag = self.next_tag.max(tag.saturating_add(1));
            return Ok(Some(message));
        }
    }
}

/// Input-mode consumer: hand every queued message to `transport` and mark it done on
/// `barrier`, whether or not the send worked. Runs until the producer closes the queue.
/// Returns the number sent, or the first send error once the queue is drained.
pub fn drain_to_transport<T: Transport + ?Sized>(
    rx: &Receiver<Message>,
    barrier: &CompletionBarrier,
    transport: &mut T,
) -> crate::Result<usize> {
    let mut sent = 0_usize;
    let mut first_error: Option<BridgeError> = None;
    for message in rx.iter() {
        let result = transport.send(message);
        barrier.done();
        match result {
            Ok(()) => sent += 1,
            Err(e) => {
                warn!("transport send failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
    }
    debug!("queue closed after {} message(s)", sent);
    match first_error {
        Some(e) => Err(e),
        None => Ok(sent),
    }
}

/// Output-mode producer: forward everything `transport` delivers onto `tx` until it runs
/// dry, passing each verify record that comes back to `transport.confirm` and `on_verify`
/// as it arrives. Returns the number of messages forwarded. Closing the queue is left to
/// the caller (drop `tx`).
pub fn feed_from_transport<T, F>(
    transport: &mut T,
    tx: &Sender<Message>,
    verify_rx: &Receiver<Verify>,
    mut on_verify: F,
) -> crate::Result<usize>
where
    T: Transport + ?Sized,
    F: FnMut(&Verify),
{
    let mut forwarded = 0_usize;
    while let Some(message) = transport.receive()? {
        if tx.send(message).is_err() {
            return Err(BridgeError::QueueClosed);
        }
        forwarded += 1;
        for verify in verify_rx.try_iter() {
            transport.confirm(&verify)?;
            on_verify(&verify);
        }
    }
    Ok(forwarded)
}
