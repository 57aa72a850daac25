//! Pipeline components: scan, decode, barrier, encode, and the drivers that wire them.

pub mod attrs;
pub mod barrier;
pub mod context;
pub mod orchestrator;
pub mod output;
pub mod reader;
pub mod scanner;
pub mod writer;

pub use attrs::{ROUTING_KEY_ATTR, XATTR_PREFIX, message_from_attrs, to_pax_records};
pub use barrier::CompletionBarrier;
pub use context::{InputChannels, OutputChannels, create_input_channels, create_output_channels};
pub use orchestrator::{InputPath, OutputPath};
pub use output::ensure;
pub use reader::unpack;
pub use scanner::{WorkQueue, scan};
pub use writer::{TarballBuilder, encode_batch, entry_name};
