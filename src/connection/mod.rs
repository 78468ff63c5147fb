//! # Connection
//!
//! Keeps one live socket to the session endpoint and retries on a fixed
//! schedule when it drops.
//!
//! 1. [`machine`]: pure state machine (`Signal` in, `Action` out).
//! 2. [`manager`]: tokio driver that owns the socket and the retry timer and
//!    executes the machine's actions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let (conn, mut updates) = ConnectionManager::open(ConnectionConfig::new(url));
//! while let Some(update) = updates.recv().await {
//!     match update {
//!         ConnectionUpdate::State(s) => println!("{s}"),
//!         ConnectionUpdate::Frame(f) => { /* reconcile */ }
//!     }
//! }
//! ```

pub mod machine;
pub mod manager;

pub use machine::{Action, ConnectionMachine, Signal};
pub use manager::{ConnectionConfig, ConnectionManager, ConnectionUpdate, DEFAULT_RETRY_INTERVAL};

/// Externally visible connection state; drives the status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    Open,
    ClosedRetrying,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Connecting     => "connecting",
            ConnectionState::Open           => "connected",
            ConnectionState::ClosedRetrying => "disconnected, retrying",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_open_is_connected() {
        assert_eq!(ConnectionState::Open.to_string(), "connected");
    }

    #[test]
    fn display_closed_mentions_retry() {
        assert!(ConnectionState::ClosedRetrying.to_string().contains("retrying"));
    }
}
