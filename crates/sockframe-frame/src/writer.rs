use sockframe_transport::ByteStream;
use tracing::{debug, trace};

use crate::codec::{encode_prefix, wire_size, MAX_PAYLOAD};
use crate::error::{FrameError, Result};
use crate::ring::RingBuffer;

/// Outcome of a non-blocking flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// Nothing left to send.
    Drained,
    /// Bytes remain buffered; flush again when the stream is writable.
    Pending,
}

/// Encodes outgoing messages into a fixed buffer and drains it to a stream.
///
/// Frames are encoded whole at enqueue time, so a flush that sends only part
/// of the buffer never corrupts framing: the peer reassembles the byte stream
/// in order.
#[derive(Debug)]
pub struct FrameWriter {
    buf: RingBuffer,
    flush_threshold: Option<usize>,
}

impl FrameWriter {
    /// Create a writer that never flushes on its own.
    pub fn new(capacity: usize) -> Self {
        Self::with_flush_threshold(capacity, None)
    }

    /// Create a writer that flushes eagerly once more than `threshold` bytes
    /// are buffered after an enqueue.
    pub fn with_flush_threshold(capacity: usize, threshold: Option<usize>) -> Self {
        Self {
            buf: RingBuffer::new(capacity),
            flush_threshold: threshold,
        }
    }

    /// Encode `payload` into the buffer without touching the stream.
    ///
    /// Nothing is written unless the whole frame fits.
    pub fn enqueue(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }

        let needed = wire_size(payload.len());
        if needed > self.buf.available() {
            return Err(FrameError::BufferFull {
                needed,
                available: self.buf.available(),
            });
        }

        let prefix = encode_prefix(payload.len())?;
        let wrote = self.buf.put(&prefix) && self.buf.put(payload);
        debug_assert!(wrote, "room for the whole frame was checked above");
        trace!(len = payload.len(), buffered = self.buf.amount_buffered(), "enqueued");
        Ok(())
    }

    /// Enqueue with backpressure.
    ///
    /// If the frame does not fit, one flush is attempted first. After a
    /// successful enqueue that leaves more than the flush threshold buffered,
    /// one more flush is attempted; a fatal error there fails the call even
    /// though the payload is already buffered.
    pub fn enqueue_with_flush<S: ByteStream + ?Sized>(
        &mut self,
        payload: &[u8],
        sink: &mut S,
    ) -> Result<()> {
        match self.enqueue(payload) {
            Ok(()) => {}
            Err(FrameError::BufferFull { .. }) => {
                debug!(
                    len = payload.len(),
                    buffered = self.buf.amount_buffered(),
                    "no room for frame; flushing first"
                );
                self.flush_no_block(sink)?;
                self.enqueue(payload)?;
            }
            Err(err) => return Err(err),
        }

        if let Some(threshold) = self.flush_threshold {
            if self.buf.amount_buffered() > threshold {
                trace!(
                    threshold,
                    buffered = self.buf.amount_buffered(),
                    "flush threshold exceeded"
                );
                self.flush_no_block(sink)?;
            }
        }
        Ok(())
    }

    /// Issue one send of everything buffered.
    pub fn flush_no_block<S: ByteStream + ?Sized>(&mut self, sink: &mut S) -> Result<FlushStatus> {
        if self.buf.is_empty() {
            return Ok(FlushStatus::Drained);
        }

        match sink.send(self.buf.buffered_slice()) {
            Ok(0) => Err(FrameError::ConnectionClosed),
            Ok(n) => {
                if !self.buf.consume(n) {
                    return Err(FrameError::Io(std::io::Error::other(format!(
                        "stream reported {n} bytes sent of {} buffered",
                        self.buf.amount_buffered()
                    ))));
                }
                self.buf.full_compress();
                trace!(sent = n, remaining = self.buf.amount_buffered(), "flushed");
                if self.buf.is_empty() {
                    Ok(FlushStatus::Drained)
                } else {
                    Ok(FlushStatus::Pending)
                }
            }
            Err(err) if sink.is_would_block(&err) => Ok(FlushStatus::Pending),
            Err(err) => Err(FrameError::Io(err)),
        }
    }

    /// Discard everything queued.
    pub fn reset(&mut self) {
        self.buf.reset();
    }

    /// Bytes queued for sending.
    pub fn amount_buffered(&self) -> usize {
        self.buf.amount_buffered()
    }

    /// The encoded bytes waiting to be sent.
    pub fn pending(&self) -> &[u8] {
        self.buf.buffered_slice()
    }

    pub fn flush_threshold(&self) -> Option<usize> {
        self.flush_threshold
    }

    pub fn set_flush_threshold(&mut self, threshold: Option<usize>) {
        self.flush_threshold = threshold;
    }

    /// Borrow the underlying buffer.
    pub fn buffer(&self) -> &RingBuffer {
        &self.buf
    }
}
