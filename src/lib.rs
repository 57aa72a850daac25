//! tarbridge: move messages between gzip tar bundles on disk and a message transport.
//!
//! Input mode decodes archives into a backpressured message stream; output mode packs a
//! message stream into size-bounded archive batches and reports one [`Verify`] per batch.

pub mod engine;
pub mod error;
pub mod fs;
pub mod pipeline;
pub mod transport;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use error::BridgeError;
pub type Result<T> = std::result::Result<T, BridgeError>;

use log::debug;
use std::thread;

use crate::fs::SharedFs;
use crate::pipeline::{InputPath, OutputPath, create_input_channels, create_output_channels};
use crate::transport::{Transport, drain_to_transport, feed_from_transport};

/// Input mode: unpack `opts.input` (an archive or a directory of archives) and send every
/// message through `transport`, in order. Returns the number of messages unpacked.
///
/// Archives are decoded on a worker thread; `transport` is driven on the calling thread and
/// acknowledges each message on the completion barrier. The archive error, if any, wins
/// over a transport error.
pub fn unpack_to<T: Transport + ?Sized>(
    fs: SharedFs,
    opts: &Opts,
    transport: &mut T,
) -> Result<usize> {
    opts.validate()?;
    let input = opts
        .input
        .as_deref()
        .ok_or_else(|| BridgeError::InvalidConfig("no input path configured".into()))?;
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );

    let source = InputPath::new(fs, input)?.with_policy(opts.policy);
    let channels = create_input_channels(opts.queue_capacity);
    let barrier = channels.barrier.clone();
    let tx = channels.tx;

    let producer = thread::spawn(move || source.send(tx, &barrier));
    let drained = drain_to_transport(&channels.rx, &channels.barrier, transport);
    let unpacked = producer
        .join()
        .map_err(|_| BridgeError::Transport("producer thread panicked".into()))?;

    let total = unpacked?;
    drained?;
    Ok(total)
}

/// Output mode: read messages from `transport` until it is exhausted and pack them into
/// batch files under `opts.output`. `on_verify` sees every batch result as it arrives.
/// Returns the number of batch files written.
pub fn pack_from<T, F>(fs: SharedFs, opts: &Opts, transport: &mut T, mut on_verify: F) -> Result<usize>
where
    T: Transport + ?Sized,
    F: FnMut(&Verify),
{
    opts.validate()?;
    let output = opts
        .output
        .as_deref()
        .ok_or_else(|| BridgeError::InvalidConfig("no output path configured".into()))?;
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );

    let sink = OutputPath::new(fs, output, opts.batch_size)?;
    let channels = create_output_channels(opts.queue_capacity);
    let rx = channels.rx;
    let verify_tx = channels.verify_tx;

    let encoder = thread::spawn(move || sink.receive(&rx, &verify_tx));
    let fed = feed_from_transport(transport, &channels.tx, &channels.verify_rx, &mut on_verify);
    drop(channels.tx);
    let packed = encoder
        .join()
        .map_err(|_| BridgeError::Transport("encoder thread panicked".into()))?;

    for verify in channels.verify_rx.try_iter() {
        transport.confirm(&verify)?;
        on_verify(&verify);
    }

    let batches = packed?;
    fed?;
    Ok(batches)
}
