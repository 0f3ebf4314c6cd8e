//! mio-backed multiplexer.
//!
//! Readiness-based model: poll tells us when sockets are ready, then the
//! caller performs non-blocking read/write syscalls. Uses epoll on Linux,
//! kqueue on macOS.
//!
//! Live registrations are tracked in a slab so every token handed out can be
//! checked on `modify`/`deregister`. Slab keys are reused after release.

use crate::runtime::error::{Error, Result};
use crate::runtime::multiplexer::{Event, Interest, Multiplexer, Notify, Token};
use mio::event::Source;
use mio::{Events, Poll, Waker};
use slab::Slab;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

const WAKE_TOKEN: mio::Token = mio::Token(usize::MAX);

/// Multiplexer over a single `mio::Poll` instance.
pub struct MioMultiplexer {
    poll: Poll,
    events: Events,
    waker: Arc<Waker>,
    /// Interest of each live registration, keyed by token.
    registrations: Slab<Interest>,
}

impl MioMultiplexer {
    /// Create a multiplexer that returns at most `capacity` events per wait.
    pub fn new(capacity: usize) -> io::Result<Self> {
        let poll = Poll::new()?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);

        Ok(Self {
            poll,
            events: Events::with_capacity(capacity),
            waker,
            registrations: Slab::new(),
        })
    }

    /// Interest currently recorded for `token`.
    pub fn interest(&self, token: Token) -> Option<Interest> {
        self.registrations.get(token.0).copied()
    }
}

fn to_mio(interest: Interest) -> mio::Interest {
    match (interest.is_readable(), interest.is_writable()) {
        (true, true) => mio::Interest::READABLE | mio::Interest::WRITABLE,
        (false, true) => mio::Interest::WRITABLE,
        _ => mio::Interest::READABLE,
    }
}

impl Multiplexer for MioMultiplexer {
    fn register<S>(&mut self, handle: &mut S, interest: Interest) -> Result<Token>
    where
        S: Source + ?Sized,
    {
        let entry = self.registrations.vacant_entry();
        let token = Token(entry.key());

        self.poll
            .registry()
            .register(handle, mio::Token(token.0), to_mio(interest))
            .map_err(|source| Error::Registration { source })?;

        entry.insert(interest);
        Ok(token)
    }

    fn modify<S>(&mut self, handle: &mut S, token: Token, interest: Interest) -> Result<()>
    where
        S: Source + ?Sized,
    {
        let current = self
            .registrations
            .get_mut(token.0)
            .ok_or(Error::StaleToken { token })?;

        self.poll
            .registry()
            .reregister(handle, mio::Token(token.0), to_mio(interest))
            .map_err(|source| Error::Registration { source })?;

        *current = interest;
        Ok(())
    }

    fn deregister<S>(&mut self, handle: &mut S, token: Token) -> Result<()>
    where
        S: Source + ?Sized,
    {
        // Release the token even if the OS call fails, so it is never
        // reported as live again.
        if self.registrations.try_remove(token.0).is_none() {
            return Err(Error::StaleToken { token });
        }

        self.poll
            .registry()
            .deregister(handle)
            .map_err(|source| Error::Registration { source })
    }

    fn wait(&mut self, events: &mut Vec<Event>, timeout: Option<Duration>) -> Result<()> {
        events.clear();

        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(source) => return Err(Error::MultiplexerFatal { source }),
        }

        for event in self.events.iter() {
            if event.token() == WAKE_TOKEN {
                trace!("Multiplexer woken");
                continue;
            }

            events.push(Event {
                token: Token(event.token().0),
                readable: event.is_readable() || event.is_read_closed(),
                writable: event.is_writable() || event.is_write_closed(),
                error: event.is_error(),
            });
        }

        Ok(())
    }

    fn notifier(&self) -> Arc<dyn Notify> {
        self.waker.clone()
    }

    fn registrations(&self) -> usize {
        self.registrations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mio::net::TcpListener;
    use std::io::Write;
    use std::thread;

    fn listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0".parse().unwrap()).unwrap()
    }

    #[test]
    fn test_register_and_wait_for_accept() {
        let mut mux = MioMultiplexer::new(16).unwrap();
        let mut listener = listener();
        let addr = listener.local_addr().unwrap();

        let token = mux.register(&mut listener, Interest::READABLE).unwrap();
        assert_eq!(mux.registrations(), 1);

        let _client = std::net::TcpStream::connect(addr).unwrap();

        let mut events = Vec::new();
        mux.wait(&mut events, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].token, token);
        assert!(events[0].readable);
    }

    #[test]
    fn test_wait_times_out_empty() {
        let mut mux = MioMultiplexer::new(16).unwrap();
        let mut listener = listener();
        mux.register(&mut listener, Interest::READABLE).unwrap();

        let mut events = vec![Event {
            token: Token(9),
            readable: true,
            writable: false,
            error: false,
        }];
        mux.wait(&mut events, Some(Duration::from_millis(10)))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_double_registration_rejected() {
        let mut mux = MioMultiplexer::new(16).unwrap();
        let mut listener = listener();

        mux.register(&mut listener, Interest::READABLE).unwrap();
        let err = mux.register(&mut listener, Interest::READABLE).unwrap_err();
        assert!(matches!(err, Error::Registration { .. }));
        // The failed attempt must not leak a token.
        assert_eq!(mux.registrations(), 1);
    }

    #[test]
    fn test_modify_records_interest() {
        let mut mux = MioMultiplexer::new(16).unwrap();
        let mut listener = listener();

        let token = mux.register(&mut listener, Interest::READABLE).unwrap();
        mux.modify(&mut listener, token, Interest::BOTH).unwrap();
        assert_eq!(mux.interest(token), Some(Interest::BOTH));
    }

    #[test]
    fn test_stale_token() {
        let mut mux = MioMultiplexer::new(16).unwrap();
        let mut listener = listener();

        let token = mux.register(&mut listener, Interest::READABLE).unwrap();
        mux.deregister(&mut listener, token).unwrap();
        assert_eq!(mux.registrations(), 0);

        let err = mux.deregister(&mut listener, token).unwrap_err();
        assert!(matches!(err, Error::StaleToken { token: t } if t == token));

        let err = mux
            .modify(&mut listener, token, Interest::WRITABLE)
            .unwrap_err();
        assert!(matches!(err, Error::StaleToken { .. }));
    }

    #[test]
    fn test_token_reused_after_release() {
        let mut mux = MioMultiplexer::new(16).unwrap();
        let mut first = listener();
        let mut second = listener();

        let t1 = mux.register(&mut first, Interest::READABLE).unwrap();
        mux.deregister(&mut first, t1).unwrap();
        let t2 = mux.register(&mut second, Interest::READABLE).unwrap();
        assert_eq!(t1, t2);
    }

    #[test]
    fn test_notifier_interrupts_wait() {
        let mut mux = MioMultiplexer::new(16).unwrap();
        let notifier = mux.notifier();

        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            notifier.notify().unwrap();
        });

        let mut events = Vec::new();
        mux.wait(&mut events, None).unwrap();
        assert!(events.is_empty());
        waker.join().unwrap();
    }

    #[test]
    fn test_readable_event_for_stream() {
        let mut mux = MioMultiplexer::new(16).unwrap();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = std::net::TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        server_side.set_nonblocking(true).unwrap();
        let mut stream = mio::net::TcpStream::from_std(server_side);

        let token = mux.register(&mut stream, Interest::READABLE).unwrap();
        client.write_all(b"ping\n").unwrap();

        let mut events = Vec::new();
        mux.wait(&mut events, Some(Duration::from_secs(5))).unwrap();
        assert!(events.iter().any(|e| e.token == token && e.readable));
    }
}
