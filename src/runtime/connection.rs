//! Connection state machine and registry.
//!
//! Each connection tracks its lifecycle state, its current interest set, and
//! its buffers. The registry owns every live connection; the multiplexer only
//! knows a connection through its token.

use crate::runtime::buffer::ConnectionBuffer;
use crate::runtime::multiplexer::{Interest, Token};
use mio::net::TcpStream;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Current state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Just accepted, nothing read yet.
    Accepted,
    /// Normal read/echo cycle.
    Active,
    /// Disconnect, farewell, or error observed. Torn down once queued output
    /// drains.
    Closing,
    /// Terminal. No further I/O; the registry entry is removed.
    Closed,
}

/// A single client connection.
#[derive(Debug)]
pub struct Connection {
    /// Non-blocking socket.
    pub stream: TcpStream,
    /// Registration token, also the connection identifier.
    pub token: Token,
    /// Remote address, for logging.
    pub peer: SocketAddr,
    /// Interest set currently registered with the multiplexer.
    pub interest: Interest,
    /// Inbound and outbound bytes.
    pub buffer: ConnectionBuffer,
    state: ConnState,
}

impl Connection {
    /// Create a new connection in the `Accepted` state with read interest.
    pub fn new(stream: TcpStream, token: Token, peer: SocketAddr, buffer: ConnectionBuffer) -> Self {
        Self {
            stream,
            token,
            peer,
            interest: Interest::READABLE,
            buffer,
            state: ConnState::Accepted,
        }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Record a successful read. `Accepted` becomes `Active`.
    pub fn activate(&mut self) {
        if self.state == ConnState::Accepted {
            self.state = ConnState::Active;
        }
    }

    /// Schedule teardown after queued output drains.
    pub fn begin_closing(&mut self) {
        if matches!(self.state, ConnState::Accepted | ConnState::Active) {
            self.state = ConnState::Closing;
        }
    }

    /// Schedule teardown without flushing: queued output is discarded.
    pub fn abort(&mut self) {
        self.buffer.discard_outbound();
        self.begin_closing();
    }

    /// Enter the terminal state.
    pub fn mark_closed(&mut self) {
        self.state = ConnState::Closed;
    }

    /// Whether the connection still accepts inbound data.
    pub fn is_reading(&self) -> bool {
        matches!(self.state, ConnState::Accepted | ConnState::Active)
    }

    /// Interest set the connection needs next.
    ///
    /// `None` means there is nothing left to wait for and the connection
    /// should move to `Closed`.
    pub fn desired_interest(&self) -> Option<Interest> {
        let pending = self.buffer.has_pending_output();
        match self.state {
            ConnState::Accepted | ConnState::Active if pending => Some(Interest::BOTH),
            ConnState::Accepted | ConnState::Active => Some(Interest::READABLE),
            ConnState::Closing if pending => Some(Interest::WRITABLE),
            ConnState::Closing | ConnState::Closed => None,
        }
    }
}

/// Registry of live connections keyed by registration token.
pub struct ConnectionRegistry {
    connections: HashMap<Token, Connection>,
    max_connections: usize,
}

impl ConnectionRegistry {
    /// Create a new registry with specified maximum capacity.
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::with_capacity(max_connections),
            max_connections,
        }
    }

    /// Insert a connection under its token.
    ///
    /// Hands the connection back if the registry is at capacity or the token
    /// is already in use.
    pub fn insert(&mut self, conn: Connection) -> Result<(), Connection> {
        if self.is_full() || self.connections.contains_key(&conn.token) {
            return Err(conn);
        }
        self.connections.insert(conn.token, conn);
        Ok(())
    }

    pub fn get(&self, token: Token) -> Option<&Connection> {
        self.connections.get(&token)
    }

    pub fn get_mut(&mut self, token: Token) -> Option<&mut Connection> {
        self.connections.get_mut(&token)
    }

    pub fn remove(&mut self, token: Token) -> Option<Connection> {
        self.connections.remove(&token)
    }

    pub fn contains(&self, token: Token) -> bool {
        self.connections.contains_key(&token)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Whether another connection would exceed the limit.
    pub fn is_full(&self) -> bool {
        self.connections.len() >= self.max_connections
    }

    /// Maximum number of connections allowed.
    pub fn capacity(&self) -> usize {
        self.max_connections
    }

    /// Tokens of every live connection.
    pub fn tokens(&self) -> Vec<Token> {
        self.connections.keys().copied().collect()
    }
}
