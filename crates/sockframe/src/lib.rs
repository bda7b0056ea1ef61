//! Buffered length-prefixed message framing over non-blocking sockets.
//!
//! sockframe moves discrete messages over a byte stream. Each message is
//! written as a 2-byte big-endian length followed by the payload, buffered in
//! fixed-size regions, and pushed through the socket without ever blocking.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-stream traits and a non-blocking TCP socket
//! - [`frame`]: ring buffer, frame reader and frame writer
//! - [`conn`]: connection state machine with round-robin failover (behind `conn` feature)

/// Re-export transport types.
pub mod transport {
    pub use sockframe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sockframe_frame::*;
}

/// Re-export connection types (requires `conn` feature).
#[cfg(feature = "conn")]
pub mod conn {
    pub use sockframe_conn::*;
}
