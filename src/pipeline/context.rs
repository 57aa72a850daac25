//! Channels connecting the producer and consumer sides of a run.

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

use crate::{Message, Verify};

use super::barrier::CompletionBarrier;

/// Everything one input-mode run shares between producer and consumer.
/// The producer keeps `tx` and closes the queue by dropping it; the consumer owns `rx`.
pub struct InputChannels {
    pub tx: Sender<Message>,
    pub rx: Receiver<Message>,
    pub barrier: CompletionBarrier,
}

/// Output-mode wiring: messages in, one verify record per written batch out.
pub struct OutputChannels {
    pub tx: Sender<Message>,
    pub rx: Receiver<Message>,
    pub verify_tx: Sender<Verify>,
    pub verify_rx: Receiver<Verify>,
}

/// Bounded message queue; `capacity` is the backpressure window.
pub fn create_input_channels(capacity: usize) -> InputChannels {
    let (tx, rx) = bounded::<Message>(capacity);
    InputChannels {
        tx,
        rx,
        barrier: CompletionBarrier::new(),
    }
}

/// Verify records are few (one per batch), so their channel is unbounded and the encoder
/// never stalls on a slow reader of results.
pub fn create_output_channels(capacity: usize) -> OutputChannels {
    let (tx, rx) = bounded::<Message>(capacity);
    let (verify_tx, verify_rx) = unbounded::<Verify>();
    OutputChannels {
        tx,
        rx,
        verify_tx,
        verify_rx,
    }
}
