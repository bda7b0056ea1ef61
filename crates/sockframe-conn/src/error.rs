use crate::state::ConnectionState;

/// Errors that can occur in connection operations.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Transport-level error (open, configure, connect).
    #[error("transport error: {0}")]
    Transport(#[from] sockframe_transport::TransportError),

    /// Frame-level error (buffering, send/receive, peer shutdown).
    #[error("frame error: {0}")]
    Frame(#[from] sockframe_frame::FrameError),

    /// No candidate addresses have been registered.
    #[error("no addresses to connect to")]
    NoAddresses,

    /// The operation needs an established connection.
    #[error("connection is not established (state: {state})")]
    NotConnected { state: ConnectionState },

    /// A connect was requested while one is already underway or established.
    #[error("connection already active (state: {state})")]
    AlreadyActive { state: ConnectionState },
}

impl ConnectionError {
    /// Whether the peer shut the stream down (as opposed to a hard failure).
    pub fn is_peer_closed(&self) -> bool {
        matches!(
            self,
            ConnectionError::Frame(sockframe_frame::FrameError::PeerClosed)
        )
    }
}

pub type Result<T> = std::result::Result<T, ConnectionError>;
