use sockframe_frame::{wire_size, MAX_PAYLOAD};

/// Buffer capacity that fits exactly one maximum-size frame.
pub const DEFAULT_BUFFER_CAPACITY: usize = MAX_PAYLOAD + sockframe_frame::PREFIX_SIZE;

/// Default writer flush point.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 4 * 1024;

/// Buffer sizing for a [`crate::Connection`], fixed for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Read buffer capacity. Bounds the largest receivable frame.
    pub reader_capacity: usize,
    /// Write buffer capacity.
    pub writer_capacity: usize,
    /// Flush eagerly once more than this many bytes are queued.
    /// `None` disables automatic flushing.
    pub flush_threshold: Option<usize>,
}

impl ConnectionConfig {
    /// Largest payload the reader can ever assemble.
    pub fn max_inbound_payload(&self) -> usize {
        self.reader_capacity
            .saturating_sub(wire_size(0))
            .min(MAX_PAYLOAD)
    }

    /// Largest payload the writer can ever queue.
    pub fn max_outbound_payload(&self) -> usize {
        self.writer_capacity
            .saturating_sub(wire_size(0))
            .min(MAX_PAYLOAD)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reader_capacity: DEFAULT_BUFFER_CAPACITY,
            writer_capacity: DEFAULT_BUFFER_CAPACITY,
            flush_threshold: Some(DEFAULT_FLUSH_THRESHOLD),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fit_largest_frame() {
        let cfg = ConnectionConfig::default();
        assert_eq!(cfg.max_inbound_payload(), MAX_PAYLOAD);
        assert_eq!(cfg.max_outbound_payload(), MAX_PAYLOAD);
        assert_eq!(cfg.flush_threshold, Some(DEFAULT_FLUSH_THRESHOLD));
    }

    #[test]
    fn small_buffers_limit_payload() {
        let cfg = ConnectionConfig {
            reader_capacity: 64,
            writer_capacity: 1,
            flush_threshold: None,
        };
        assert_eq!(cfg.max_inbound_payload(), 62);
        assert_eq!(cfg.max_outbound_payload(), 0);
    }
}
