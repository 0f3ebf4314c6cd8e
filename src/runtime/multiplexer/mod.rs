//! Readiness multiplexer contract.
//!
//! The reactor loop talks to the OS readiness primitive only through the
//! [`Multiplexer`] trait, so the backing strategy can change without touching
//! the loop. Tokens are handed out by the multiplexer at registration time and
//! are the only link between a readiness event and the connection it belongs
//! to; the multiplexer never owns the handles it watches.
//!
//! Backends:
//! - [`poll::MioMultiplexer`]: mio (epoll on Linux, kqueue on macOS)

pub mod poll;

use crate::runtime::error::Result;
use mio::event::Source;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

pub use poll::MioMultiplexer;

/// Identifier of a live registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(pub usize);

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Readiness a registration is interested in. Never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest {
    readable: bool,
    writable: bool,
}

impl Interest {
    pub const READABLE: Interest = Interest {
        readable: true,
        writable: false,
    };
    pub const WRITABLE: Interest = Interest {
        readable: false,
        writable: true,
    };
    pub const BOTH: Interest = Interest {
        readable: true,
        writable: true,
    };

    pub fn is_readable(self) -> bool {
        self.readable
    }

    pub fn is_writable(self) -> bool {
        self.writable
    }
}

/// One readiness notification, consumed within the loop iteration that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub token: Token,
    pub readable: bool,
    pub writable: bool,
    pub error: bool,
}

/// Cross-thread wakeup for a thread blocked in [`Multiplexer::wait`].
pub trait Notify: Send + Sync {
    fn notify(&self) -> io::Result<()>;
}

impl Notify for mio::Waker {
    fn notify(&self) -> io::Result<()> {
        self.wake()
    }
}

/// Register handles, adjust their interest, and block until one is ready.
pub trait Multiplexer {
    /// Begin watching `handle`.
    ///
    /// Fails with `Error::Registration` if the handle is invalid or already
    /// registered.
    fn register<S>(&mut self, handle: &mut S, interest: Interest) -> Result<Token>
    where
        S: Source + ?Sized;

    /// Replace the interest set of an existing registration.
    ///
    /// Fails with `Error::StaleToken` if `token` is not live.
    fn modify<S>(&mut self, handle: &mut S, token: Token, interest: Interest) -> Result<()>
    where
        S: Source + ?Sized;

    /// Stop watching `handle`. Must happen before the handle is closed.
    ///
    /// Fails with `Error::StaleToken` if `token` is not live.
    fn deregister<S>(&mut self, handle: &mut S, token: Token) -> Result<()>
    where
        S: Source + ?Sized;

    /// Block until a registered handle is ready, a notifier fires, or
    /// `timeout` elapses. `None` waits without bound.
    ///
    /// `events` is cleared first; it is left empty on timeout or wakeup.
    /// Fails with `Error::MultiplexerFatal` if the primitive is unusable.
    fn wait(&mut self, events: &mut Vec<Event>, timeout: Option<Duration>) -> Result<()>;

    /// Handle that interrupts a blocked [`wait`](Multiplexer::wait) from any
    /// thread.
    fn notifier(&self) -> Arc<dyn Notify>;

    /// Number of live registrations.
    fn registrations(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interest_sets() {
        assert!(Interest::READABLE.is_readable());
        assert!(!Interest::READABLE.is_writable());
        assert!(Interest::WRITABLE.is_writable());
        assert!(!Interest::WRITABLE.is_readable());
        assert!(Interest::BOTH.is_readable() && Interest::BOTH.is_writable());
    }

    #[test]
    fn test_token_display() {
        assert_eq!(Token(42).to_string(), "42");
    }
}
