//! Byte-stream capability traits for sockframe.
//!
//! The framing layer never touches sockets directly. It talks to a
//! [`ByteStream`] (one non-blocking `send`/`recv` per call), and the
//! connection layer additionally drives a [`StreamSocket`] through its
//! connect lifecycle. Alternate transports (an encrypted stream, an
//! in-memory pipe) plug in by implementing these traits.
//!
//! This is the lowest layer of sockframe. [`TcpSocket`] is the stock
//! implementation on Unix.

pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::{ByteStream, ConnectStatus, SocketFactory, StreamSocket};

#[cfg(unix)]
pub use tcp::{TcpSocket, TcpSocketFactory};
