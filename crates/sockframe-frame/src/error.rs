/// Errors that can occur while framing, buffering, or moving frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload cannot be represented by the 2-byte length prefix.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Not enough free space in the writer buffer for the whole frame.
    #[error("write buffer full ({needed} bytes needed, {available} available)")]
    BufferFull { needed: usize, available: usize },

    /// The read buffer is full and compaction freed nothing.
    #[error("read buffer saturated ({capacity} bytes buffered without a complete frame)")]
    BufferSaturated { capacity: usize },

    /// The peer shut the stream down.
    #[error("peer closed the stream")]
    PeerClosed,

    /// The stream accepted zero bytes for a non-empty send.
    #[error("connection closed (zero-length send)")]
    ConnectionClosed,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Whether this error leaves the byte stream unusable.
    ///
    /// Only an oversized payload is rejected up front with framing intact.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FrameError::PayloadTooLarge { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_classification() {
        assert!(!FrameError::PayloadTooLarge { size: 70_000, max: 65_535 }.is_fatal());
        assert!(FrameError::BufferFull { needed: 10, available: 4 }.is_fatal());
        assert!(FrameError::BufferSaturated { capacity: 8 }.is_fatal());
        assert!(FrameError::PeerClosed.is_fatal());
        assert!(FrameError::ConnectionClosed.is_fatal());
        assert!(FrameError::Io(std::io::Error::other("boom")).is_fatal());
    }
}
