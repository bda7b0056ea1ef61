//! Connection lifecycle states.
//!
//! ```text
//!   Unbound ──do_connect──▶ Connecting ──poll_connect──▶ Connected
//!      │                        │                           │
//!      │                        └──── any fatal error ──────┤
//!      │                                                    ▼
//!      └────────────── reset ─────────────────────────▶  Closed
//!                                                           │
//!                     do_connect (next address) ◀───────────┘
//! ```

/// All possible states of a [`crate::Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Never connected; initial state.
    #[default]
    Unbound,
    /// A non-blocking connect has been issued and has not completed.
    Connecting,
    /// The stream is established; send/receive are allowed.
    Connected,
    /// Torn down after an error or an explicit reset.
    Closed,
}

impl ConnectionState {
    /// Whether `do_connect` may be called from this state.
    pub fn can_connect(self) -> bool {
        matches!(self, ConnectionState::Unbound | ConnectionState::Closed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Unbound => "unbound",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unbound() {
        assert_eq!(ConnectionState::default(), ConnectionState::Unbound);
    }

    #[test]
    fn connectable_states() {
        assert!(ConnectionState::Unbound.can_connect());
        assert!(ConnectionState::Closed.can_connect());
        assert!(!ConnectionState::Connecting.can_connect());
        assert!(!ConnectionState::Connected.can_connect());
    }

    #[test]
    fn display_names() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }
}
