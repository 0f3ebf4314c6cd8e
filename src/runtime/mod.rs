//! Single-threaded readiness runtime.
//!
//! Components, leaves first:
//! - `ConnectionBuffer`: per-connection inbound/outbound bytes with line framing
//! - `Connection` / `ConnectionRegistry`: lifecycle state and ownership
//! - `Multiplexer`: register/modify/deregister/wait over the OS primitive
//! - `Reactor`: the wait/dispatch loop driving everything above

pub mod buffer;
pub mod connection;
pub mod error;
pub mod multiplexer;
pub mod reactor;
pub mod signal;

pub use connection::{ConnState, Connection, ConnectionRegistry};
pub use error::{Error, Result};
pub use multiplexer::{Event, Interest, MioMultiplexer, Multiplexer, Token};
pub use reactor::{Reactor, ReactorState, ShutdownHandle};

use crate::config::Config;

/// Bind, forward stop signals to the reactor, and serve until stopped.
pub fn run(config: &Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let reactor = Reactor::bind(config)?;
    signal::forward_stop_signals(reactor.shutdown_handle())?;
    reactor.run()?;
    Ok(())
}
