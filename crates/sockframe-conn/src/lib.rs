//! Framed client connections with round-robin failover.
//!
//! A [`Connection`] owns one socket, one [`sockframe_frame::FrameReader`] and
//! one [`sockframe_frame::FrameWriter`]. It walks a queue of candidate
//! addresses, connects without blocking, and resets itself completely on any
//! error that could leave the byte stream out of sync.

pub mod address;
pub mod config;
pub mod connection;
pub mod error;
pub mod state;

pub use address::AddressQueue;
pub use config::{ConnectionConfig, DEFAULT_BUFFER_CAPACITY, DEFAULT_FLUSH_THRESHOLD};
pub use connection::{Connection, ConnectionHooks};
pub use error::{ConnectionError, Result};
pub use state::ConnectionState;
