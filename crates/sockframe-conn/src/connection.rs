use std::net::SocketAddr;

use bytes::Bytes;
use sockframe_frame::{FlushStatus, FrameReader, FrameWriter};
use sockframe_transport::{ConnectStatus, SocketFactory, StreamSocket, TransportError};
use tracing::{debug, info, warn};

use crate::address::AddressQueue;
use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, Result};
use crate::state::ConnectionState;

/// Callbacks fired when a connection becomes established.
pub trait ConnectionHooks {
    /// The stream to `peer` is up.
    fn on_connected(&mut self, _peer: SocketAddr) {}

    /// The (empty) writer is ready for a fresh stream. Anything enqueued here
    /// goes out ahead of application messages.
    fn on_writer_ready(&mut self, _writer: &mut FrameWriter) -> sockframe_frame::Result<()> {
        Ok(())
    }
}

/// A framed, non-blocking client connection with address failover.
///
/// Any error that could desynchronise framing tears the whole connection
/// down: the socket is closed and both buffers are emptied. There is no
/// partial recovery; the caller reconnects with [`Connection::do_connect`],
/// which moves on to the next address in the queue.
pub struct Connection<F: SocketFactory> {
    factory: F,
    socket: Option<F::Socket>,
    state: ConnectionState,
    addresses: AddressQueue,
    peer: Option<SocketAddr>,
    reader: FrameReader,
    writer: FrameWriter,
    config: ConnectionConfig,
    hooks: Option<Box<dyn ConnectionHooks + Send>>,
}

impl<F: SocketFactory> Connection<F> {
    /// Create an unbound connection with the given buffer sizing.
    pub fn new(factory: F, config: ConnectionConfig) -> Self {
        Self {
            factory,
            socket: None,
            state: ConnectionState::Unbound,
            addresses: AddressQueue::new(),
            peer: None,
            reader: FrameReader::new(config.reader_capacity),
            writer: FrameWriter::with_flush_threshold(
                config.writer_capacity,
                config.flush_threshold,
            ),
            config,
            hooks: None,
        }
    }

    /// Wrap an already-established socket, e.g. one returned by `accept`.
    pub fn adopt(factory: F, socket: F::Socket, peer: SocketAddr, config: ConnectionConfig) -> Self {
        let mut conn = Self::new(factory, config);
        conn.socket = Some(socket);
        conn.peer = Some(peer);
        conn.state = ConnectionState::Connected;
        info!(%peer, "adopted established connection");
        conn
    }

    /// Attach establishment hooks.
    pub fn with_hooks(mut self, hooks: impl ConnectionHooks + Send + 'static) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }

    /// Register a candidate address. Returns `false` for a duplicate.
    pub fn add_address(&mut self, addr: SocketAddr) -> bool {
        self.addresses.push(addr)
    }

    /// Start connecting to the next address in round-robin order.
    ///
    /// Allowed from `Unbound` and `Closed`. Any failure resets the connection
    /// to `Closed`; calling again tries the following address.
    pub fn do_connect(&mut self) -> Result<ConnectionState> {
        if !self.state.can_connect() {
            return Err(ConnectionError::AlreadyActive { state: self.state });
        }
        let addr = self
            .addresses
            .next_address()
            .ok_or(ConnectionError::NoAddresses)?;

        self.peer = Some(addr);
        debug!(%addr, "connecting");

        let mut socket = match self.factory.open(addr) {
            Ok(socket) => socket,
            Err(source) => return self.fail(TransportError::Open { addr, source }),
        };

        match start_connect(&mut socket, addr) {
            Ok(status) => {
                self.socket = Some(socket);
                self.state = ConnectionState::Connecting;
                if status == ConnectStatus::Connected {
                    self.establish()?;
                }
                Ok(self.state)
            }
            Err(err) => {
                socket.close();
                self.fail(err)
            }
        }
    }

    /// Check whether a pending connect has completed.
    ///
    /// Outside `Connecting` this is a no-op that reports the current state.
    pub fn poll_connect(&mut self) -> Result<ConnectionState> {
        if self.state != ConnectionState::Connecting {
            return Ok(self.state);
        }
        let Some(socket) = self.socket.as_mut() else {
            return self.fail(TransportError::Closed);
        };

        match socket.poll_connect() {
            Ok(true) => {
                self.establish()?;
                Ok(self.state)
            }
            Ok(false) => Ok(self.state),
            Err(source) => {
                let err = match self.peer {
                    Some(addr) => TransportError::Connect { addr, source },
                    None => TransportError::Io(source),
                };
                self.fail(err)
            }
        }
    }

    /// Queue one message, flushing for room or past the flush threshold.
    ///
    /// An oversized payload is rejected without touching the connection;
    /// every other failure resets it.
    pub fn send_message(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_connected()?;
        let Some(socket) = self.socket.as_mut() else {
            return self.fail(TransportError::Closed);
        };

        match self.writer.enqueue_with_flush(payload, socket) {
            Ok(()) => Ok(()),
            Err(err) if !err.is_fatal() => Err(err.into()),
            Err(err) => self.fail(err),
        }
    }

    /// Fetch the next complete message, receiving at most once.
    ///
    /// `Ok(None)` means nothing is ready yet. Peer shutdown and receive
    /// failures reset the connection.
    pub fn get_message(&mut self) -> Result<Option<Bytes>> {
        self.ensure_connected()?;
        let Some(socket) = self.socket.as_mut() else {
            return self.fail(TransportError::Closed);
        };

        match self.reader.pump_message(socket) {
            Ok(message) => Ok(message),
            Err(err) => self.fail(err),
        }
    }

    /// Send as much queued output as the stream takes in one call.
    pub fn flush(&mut self) -> Result<FlushStatus> {
        self.ensure_connected()?;
        let Some(socket) = self.socket.as_mut() else {
            return self.fail(TransportError::Closed);
        };

        match self.writer.flush_no_block(socket) {
            Ok(status) => Ok(status),
            Err(err) => self.fail(err),
        }
    }

    /// Close the socket, drop all buffered bytes, and move to `Closed`.
    ///
    /// Registered addresses and the round-robin position are kept. Safe to
    /// call in any state, any number of times.
    pub fn reset(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
        self.reader.reset();
        self.writer.reset();
        if self.state != ConnectionState::Closed {
            debug!(peer = ?self.peer, from = %self.state, "connection reset");
        }
        self.state = ConnectionState::Closed;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Address of the current (or most recent) connect attempt.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn addresses(&self) -> &AddressQueue {
        &self.addresses
    }

    pub fn addresses_mut(&mut self) -> &mut AddressQueue {
        &mut self.addresses
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn reader(&self) -> &FrameReader {
        &self.reader
    }

    pub fn writer(&self) -> &FrameWriter {
        &self.writer
    }

    /// Borrow the socket, if one is open.
    pub fn socket(&self) -> Option<&F::Socket> {
        self.socket.as_ref()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            Ok(())
        } else {
            Err(ConnectionError::NotConnected { state: self.state })
        }
    }

    fn establish(&mut self) -> Result<()> {
        self.state = ConnectionState::Connected;
        info!(peer = ?self.peer, "connection established");

        if let Some(hooks) = self.hooks.as_mut() {
            if let Some(peer) = self.peer {
                hooks.on_connected(peer);
            }
            if let Err(err) = hooks.on_writer_ready(&mut self.writer) {
                return self.fail(err);
            }
        }
        Ok(())
    }

    fn fail<T>(&mut self, err: impl Into<ConnectionError>) -> Result<T> {
        let err = err.into();
        warn!(peer = ?self.peer, error = %err, "resetting connection");
        self.reset();
        Err(err)
    }
}

impl<F: SocketFactory> Drop for Connection<F> {
    fn drop(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
    }
}

impl<F: SocketFactory> std::fmt::Debug for Connection<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("peer", &self.peer)
            .field("addresses", &self.addresses.len())
            .field("inbound_buffered", &self.reader.amount_buffered())
            .field("outbound_buffered", &self.writer.amount_buffered())
            .finish()
    }
}

fn start_connect<S: StreamSocket>(socket: &mut S, addr: SocketAddr) -> Result<ConnectStatus> {
    socket
        .set_non_blocking()
        .map_err(TransportError::Configure)?;
    socket.set_no_delay().map_err(TransportError::Configure)?;
    let status = socket
        .connect(addr)
        .map_err(|source| TransportError::Connect { addr, source })?;
    Ok(status)
}
