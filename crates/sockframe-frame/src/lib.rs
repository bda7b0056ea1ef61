//! Length-prefixed message framing over a fixed-size sliding buffer.
//!
//! Every message on the wire is a 2-byte big-endian payload length followed
//! by the payload itself (at most 65535 bytes). Readers and writers each own
//! one [`RingBuffer`] of fixed capacity and talk to the stream through
//! [`sockframe_transport::ByteStream`], one non-blocking call at a time.
//!
//! Frames are atomic above the buffer: a reader never hands out a partial
//! frame and a writer never queues one.

pub mod codec;
pub mod error;
pub mod reader;
pub mod ring;
pub mod writer;

#[cfg(feature = "async")]
pub use codec::FrameCodec;
pub use codec::{decode_prefix, encode_prefix, wire_size, MAX_PAYLOAD, PREFIX_SIZE};
pub use error::{FrameError, Result};
pub use reader::{FrameReader, PumpStatus};
pub use ring::{MemoryRegion, RingBuffer};
pub use writer::{FlushStatus, FrameWriter};
