//! Reactor error taxonomy.
//!
//! Only `MultiplexerFatal` and `Listener` ever escape the reactor loop.
//! Everything scoped to a single connection is logged and closes that
//! connection alone.

use crate::runtime::multiplexer::Token;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Result alias for reactor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for reactor operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The multiplexer refused a handle (invalid or already registered).
    #[error("registration failed: {source}")]
    Registration {
        #[source]
        source: io::Error,
    },

    /// A token was used after its registration was released.
    #[error("stale registration token {token}")]
    StaleToken { token: Token },

    /// Read, write, or accept failed on one connection.
    #[error("I/O error on connection {token}: {source}")]
    ConnectionIo {
        token: Token,
        #[source]
        source: io::Error,
    },

    /// A connection buffer grew past its cap.
    #[error("connection {token} exceeded buffer limit of {limit} bytes")]
    BufferLimit { token: Token, limit: usize },

    /// The readiness primitive itself failed.
    #[error("multiplexer failure: {source}")]
    MultiplexerFatal {
        #[source]
        source: io::Error,
    },

    /// The listening socket could not be created.
    #[error("failed to listen on {addr}: {source}")]
    Listener {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Whether this error must stop the reactor.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MultiplexerFatal { .. } | Error::Listener { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality() {
        let fatal = Error::MultiplexerFatal {
            source: io::Error::other("epoll gone"),
        };
        assert!(fatal.is_fatal());

        let isolated = Error::ConnectionIo {
            token: Token(3),
            source: io::ErrorKind::ConnectionReset.into(),
        };
        assert!(!isolated.is_fatal());
        assert!(!Error::StaleToken { token: Token(1) }.is_fatal());
    }

    #[test]
    fn test_display_names_connection() {
        let err = Error::BufferLimit {
            token: Token(7),
            limit: 1024,
        };
        assert_eq!(
            err.to_string(),
            "connection 7 exceeded buffer limit of 1024 bytes"
        );
    }
}
