use std::io::{self, ErrorKind};
use std::net::SocketAddr;

/// A non-blocking byte stream: the only I/O surface the framing layer sees.
///
/// Each call maps to exactly one underlying send/receive attempt and must
/// return immediately. "Nothing to do right now" is reported as an error for
/// which [`ByteStream::is_would_block`] returns `true`.
pub trait ByteStream {
    /// Send bytes from `buf`, returning how many were accepted.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Receive bytes into `buf`. `Ok(0)` means the peer shut down cleanly.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Whether `err` is a retryable "no progress" signal rather than a failure.
    fn is_would_block(&self, err: &io::Error) -> bool {
        matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted)
    }
}

impl<T: ByteStream + ?Sized> ByteStream for Box<T> {
    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).send(buf)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).recv(buf)
    }

    fn is_would_block(&self, err: &io::Error) -> bool {
        (**self).is_would_block(err)
    }
}

/// Outcome of issuing a non-blocking connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStatus {
    /// The connection was established immediately.
    Connected,
    /// The attempt is underway; poll with [`StreamSocket::poll_connect`].
    InProgress,
}

/// A byte stream with a connect lifecycle.
pub trait StreamSocket: ByteStream {
    /// Put the socket into non-blocking mode.
    fn set_non_blocking(&mut self) -> io::Result<()>;

    /// Disable send coalescing (Nagle).
    fn set_no_delay(&mut self) -> io::Result<()>;

    /// Issue a connect attempt without waiting for it to complete.
    fn connect(&mut self, addr: SocketAddr) -> io::Result<ConnectStatus>;

    /// Check whether a pending connect has completed.
    ///
    /// Returns `Ok(false)` while still in progress and an error if the
    /// attempt failed.
    fn poll_connect(&mut self) -> io::Result<bool>;

    /// Release the underlying handle. Further I/O fails.
    fn close(&mut self);
}

/// Creates fresh sockets for a [`StreamSocket`]-based connection.
pub trait SocketFactory {
    type Socket: StreamSocket;

    /// Open a new, unconnected socket suitable for `addr`.
    fn open(&mut self, addr: SocketAddr) -> io::Result<Self::Socket>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl ByteStream for Silent {
        fn send(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(ErrorKind::WouldBlock))
        }

        fn recv(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(ErrorKind::WouldBlock))
        }
    }

    #[test]
    fn default_would_block_classification() {
        let stream = Silent;
        assert!(stream.is_would_block(&io::Error::from(ErrorKind::WouldBlock)));
        assert!(stream.is_would_block(&io::Error::from(ErrorKind::Interrupted)));
        assert!(!stream.is_would_block(&io::Error::from(ErrorKind::ConnectionReset)));
        assert!(!stream.is_would_block(&io::Error::from(ErrorKind::BrokenPipe)));
    }

    #[test]
    fn boxed_stream_delegates() {
        let mut boxed: Box<dyn ByteStream> = Box::new(Silent);
        let err = boxed.send(b"x").unwrap_err();
        assert!(boxed.is_would_block(&err));
        let mut buf = [0u8; 4];
        let err = boxed.recv(&mut buf).unwrap_err();
        assert!(boxed.is_would_block(&err));
    }
}
