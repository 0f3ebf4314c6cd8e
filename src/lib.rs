//! echo-reactor: a single-threaded, readiness-driven TCP line echo server.
//!
//! One thread multiplexes the listening socket and every client connection
//! through a single blocking wait, and only accepts, reads, or writes when
//! the OS reports the call will not block.
//!
//! - `runtime`: multiplexer, connection registry, buffers, and reactor loop
//! - `protocols`: the echo protocol handler
//! - `client`: a small blocking client used to exercise the server
//! - `config`: CLI and TOML configuration

pub mod client;
pub mod config;
pub mod protocols;
pub mod runtime;

pub use config::Config;
pub use runtime::{Reactor, ShutdownHandle};
