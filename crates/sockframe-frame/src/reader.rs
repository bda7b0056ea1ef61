use bytes::Bytes;
use sockframe_transport::ByteStream;
use tracing::{debug, trace};

use crate::codec::{decode_prefix, PREFIX_SIZE};
use crate::error::{FrameError, Result};
use crate::ring::RingBuffer;

/// Outcome of a single receive attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// The stream had nothing for us (would-block).
    NoProgress,
    /// This many bytes were appended to the buffer.
    GotData(usize),
    /// The peer shut the stream down.
    PeerClosed,
}

/// Extracts complete length-prefixed messages from a non-blocking stream.
///
/// Every call performs at most one receive. A frame is only ever handed out
/// whole; a partially received frame stays in the buffer untouched.
#[derive(Debug)]
pub struct FrameReader {
    buf: RingBuffer,
}

impl FrameReader {
    /// Create a reader with a fixed buffer capacity.
    ///
    /// The capacity bounds the largest frame that can be received
    /// (`capacity - 2` bytes of payload).
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: RingBuffer::new(capacity),
        }
    }

    /// Issue one receive into the free region of the buffer.
    ///
    /// Returns `Err(BufferSaturated)` when the buffer is full and compaction
    /// freed nothing; `Err(Io)` for any non-retryable receive failure.
    pub fn pump<S: ByteStream + ?Sized>(&mut self, source: &mut S) -> Result<PumpStatus> {
        if self.buf.available() == 0 {
            self.buf.compress();
            if self.buf.available() == 0 {
                return Err(FrameError::BufferSaturated {
                    capacity: self.buf.capacity(),
                });
            }
        }

        match source.recv(self.buf.open_region_mut()) {
            Ok(0) => {
                debug!(buffered = self.buf.amount_buffered(), "peer closed stream");
                Ok(PumpStatus::PeerClosed)
            }
            Ok(n) => {
                if !self.buf.commit(n) {
                    return Err(FrameError::Io(std::io::Error::other(format!(
                        "stream reported {n} bytes received into a {} byte region",
                        self.buf.available()
                    ))));
                }
                trace!(received = n, buffered = self.buf.amount_buffered(), "pumped");
                Ok(PumpStatus::GotData(n))
            }
            Err(err) if source.is_would_block(&err) => Ok(PumpStatus::NoProgress),
            Err(err) => Err(FrameError::Io(err)),
        }
    }

    /// Take the next complete message out of the buffer, if there is one.
    pub fn try_extract_message(&mut self) -> Option<Bytes> {
        let prefix = self.buf.peek(PREFIX_SIZE)?;
        let payload_len = decode_prefix([prefix[0], prefix[1]]);

        let frame = self.buf.peek(PREFIX_SIZE + payload_len)?;
        let payload = Bytes::copy_from_slice(&frame[PREFIX_SIZE..]);
        // Both halves were just peeked, so this cannot come up short.
        let consumed = self.buf.consume(PREFIX_SIZE + payload_len);
        debug_assert!(consumed);
        Some(payload)
    }

    /// Return a buffered message, or pump once and try again.
    ///
    /// `Ok(None)` means no complete message yet. Peer shutdown surfaces as
    /// `Err(PeerClosed)` so the owner can tear the stream down.
    pub fn pump_message<S: ByteStream + ?Sized>(&mut self, source: &mut S) -> Result<Option<Bytes>> {
        if let Some(message) = self.try_extract_message() {
            return Ok(Some(message));
        }

        match self.pump(source)? {
            PumpStatus::GotData(_) => Ok(self.try_extract_message()),
            PumpStatus::NoProgress => Ok(None),
            PumpStatus::PeerClosed => Err(FrameError::PeerClosed),
        }
    }

    /// Append bytes obtained outside of [`FrameReader::pump`].
    ///
    /// All-or-nothing; compacts first if the bytes would not otherwise fit.
    #[must_use]
    pub fn feed(&mut self, data: &[u8]) -> bool {
        if data.len() > self.buf.available() {
            self.buf.full_compress();
        }
        self.buf.put(data)
    }

    /// Discard all buffered bytes, including any partial frame.
    pub fn reset(&mut self) {
        self.buf.reset();
    }

    /// Bytes currently buffered (complete and partial frames).
    pub fn amount_buffered(&self) -> usize {
        self.buf.amount_buffered()
    }

    /// Borrow the underlying buffer.
    pub fn buffer(&self) -> &RingBuffer {
        &self.buf
    }
}
