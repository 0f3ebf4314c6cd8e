//! Reactor loop.
//!
//! Readiness-based model: the multiplexer tells us when sockets are ready,
//! then we perform non-blocking accept/read/write calls. A single thread owns
//! the listener, the registry, and every connection buffer, so nothing here
//! is shared or locked.
//!
//! ## Lifecycle
//!
//! `Initializing` (bind + register listener) → `Running` (wait/dispatch) →
//! `ShuttingDown` (release every connection and the listener).
//!
//! ## Failure isolation
//!
//! Any error on one connection closes that connection and is logged; the
//! loop keeps serving everyone else. Only a failure of the wait primitive
//! ends the loop.

use crate::config::Config;
use crate::protocols::echo::{decode_line, respond};
use crate::runtime::buffer::{ConnectionBuffer, Fill, LimitExceeded};
use crate::runtime::connection::{ConnState, Connection, ConnectionRegistry};
use crate::runtime::error::{Error, Result};
use crate::runtime::multiplexer::{Event, Interest, MioMultiplexer, Multiplexer, Notify, Token};
use mio::net::TcpListener;
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Reads performed on one connection per event before yielding to others.
const READ_BUDGET: usize = 16;

/// Reactor lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorState {
    Initializing,
    Running,
    ShuttingDown,
}

/// Requests a reactor stop from any thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    notifier: Arc<dyn Notify>,
}

impl ShutdownHandle {
    /// Ask the reactor to shut down and wake it if it is blocked.
    pub fn shutdown(&self) {
        self.requested.store(true, Ordering::Release);
        if let Err(e) = self.notifier.notify() {
            warn!(error = %e, "Failed to wake reactor");
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

/// Single-threaded echo reactor.
pub struct Reactor<M: Multiplexer = MioMultiplexer> {
    mux: M,
    listener: TcpListener,
    listener_token: Token,
    local_addr: SocketAddr,
    registry: ConnectionRegistry,
    events_capacity: usize,
    max_buffer_size: usize,
    read_chunk_size: usize,
    state: ReactorState,
    shutdown: Arc<AtomicBool>,
    /// Connections that spent their read budget before the socket drained.
    deferred: VecDeque<Token>,
}

impl Reactor<MioMultiplexer> {
    /// Bind the listener and register it with a mio multiplexer.
    pub fn bind(config: &Config) -> Result<Self> {
        let mux = MioMultiplexer::new(config.events_capacity)
            .map_err(|source| Error::MultiplexerFatal { source })?;
        Self::with_multiplexer(config, mux)
    }
}

impl<M: Multiplexer> Reactor<M> {
    /// Bind the listener and register it with `mux` for accept readiness.
    pub fn with_multiplexer(config: &Config, mut mux: M) -> Result<Self> {
        let addr = config.listen_addr();
        let listener = create_listener(addr, config.backlog)
            .map_err(|source| Error::Listener { addr, source })?;
        let mut listener = TcpListener::from_std(listener);
        let local_addr = listener
            .local_addr()
            .map_err(|source| Error::Listener { addr, source })?;

        let listener_token = mux.register(&mut listener, Interest::READABLE)?;

        info!(
            addr = %local_addr,
            max_connections = config.max_connections,
            max_buffer_size = config.max_buffer_size,
            "Listening"
        );

        Ok(Self {
            mux,
            listener,
            listener_token,
            local_addr,
            registry: ConnectionRegistry::new(config.max_connections),
            events_capacity: config.events_capacity,
            max_buffer_size: config.max_buffer_size,
            read_chunk_size: config.read_chunk_size,
            state: ReactorState::Initializing,
            shutdown: Arc::new(AtomicBool::new(false)),
            deferred: VecDeque::new(),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ReactorState {
        self.state
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Handle for stopping the reactor from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            requested: Arc::clone(&self.shutdown),
            notifier: self.mux.notifier(),
        }
    }

    /// Run until a shutdown is requested or the multiplexer fails.
    ///
    /// Every connection and the listener are released before returning,
    /// whichever way the loop ends.
    pub fn run(mut self) -> Result<()> {
        self.state = ReactorState::Running;
        info!(addr = %self.local_addr, "Reactor running");

        let result = self.event_loop();

        self.state = ReactorState::ShuttingDown;
        match &result {
            Ok(()) => info!("Reactor shutting down"),
            Err(e) => error!(error = %e, "Reactor failed, shutting down"),
        }
        self.release_all();

        result
    }

    fn event_loop(&mut self) -> Result<()> {
        let mut events = Vec::with_capacity(self.events_capacity);

        loop {
            // Connections that yielded still have data to read; only poll
            // for new readiness without blocking.
            let timeout = if self.deferred.is_empty() {
                None
            } else {
                Some(Duration::ZERO)
            };

            if !self.turn(&mut events, timeout)? {
                return Ok(());
            }
        }
    }

    /// One wait/dispatch pass. Returns `false` once a shutdown is requested.
    ///
    /// Each token is serviced at most once per pass, so a connection holds at
    /// most one place in the deferred queue.
    fn turn(&mut self, events: &mut Vec<Event>, timeout: Option<Duration>) -> Result<bool> {
        self.mux.wait(events, timeout)?;

        if self.shutdown.load(Ordering::Acquire) {
            return Ok(false);
        }

        let mut resumed = std::mem::take(&mut self.deferred);

        // A deferred connection that also reported readiness is serviced
        // once, with its pending read folded into the event.
        for event in events.iter_mut() {
            if let Some(pos) = resumed.iter().position(|&token| token == event.token) {
                resumed.remove(pos);
                event.readable = true;
            }
        }

        for event in events.iter() {
            self.dispatch(event);
        }

        for token in resumed {
            self.dispatch(&Event {
                token,
                readable: true,
                writable: false,
                error: false,
            });
        }

        Ok(true)
    }

    fn dispatch(&mut self, event: &Event) {
        if event.token == self.listener_token {
            self.accept_connections();
            return;
        }

        let Some(conn) = self.registry.get_mut(event.token) else {
            trace!(conn_id = %event.token, "Event for released connection");
            return;
        };

        match handle_connection_event(conn, event) {
            Ok(Progress::Idle) => {}
            Ok(Progress::Yielded) => self.deferred.push_back(event.token),
            Err(e) => log_connection_error(&e),
        }

        self.settle(event.token);
    }

    /// Drain the accept queue. One wakeup may cover many pending connections.
    fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    if self.registry.is_full() {
                        warn!(
                            peer = %peer,
                            max_connections = self.registry.capacity(),
                            "Connection limit reached, rejecting"
                        );
                        continue;
                    }

                    let token = match self.mux.register(&mut stream, Interest::READABLE) {
                        Ok(token) => token,
                        Err(e) => {
                            error!(peer = %peer, error = %e, "Failed to register connection");
                            continue;
                        }
                    };

                    let buffer = ConnectionBuffer::new(self.max_buffer_size, self.read_chunk_size);
                    let conn = Connection::new(stream, token, peer, buffer);

                    if let Err(mut conn) = self.registry.insert(conn) {
                        error!(conn_id = %token, "Token already in registry");
                        if let Err(e) = self.mux.deregister(&mut conn.stream, token) {
                            log_connection_error(&e);
                        }
                        continue;
                    }

                    debug!(conn_id = %token, peer = %peer, "Accepted connection");
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    continue
                }
                Err(e) => {
                    error!(error = %e, "Accept error");
                    break;
                }
            }
        }
    }

    /// Bring the registration in line with the connection's state, releasing
    /// it once nothing is left to wait for.
    fn settle(&mut self, token: Token) {
        let Some(conn) = self.registry.get_mut(token) else {
            return;
        };

        match conn.desired_interest() {
            Some(interest) if interest != conn.interest => {
                match self.mux.modify(&mut conn.stream, token, interest) {
                    Ok(()) => conn.interest = interest,
                    Err(e) => {
                        log_connection_error(&e);
                        conn.abort();
                        conn.mark_closed();
                    }
                }
            }
            Some(_) => {}
            None => conn.mark_closed(),
        }

        if conn.state() == ConnState::Closed {
            self.release(token);
        }
    }

    /// Deregister and drop a connection. The socket closes after deregistration.
    fn release(&mut self, token: Token) {
        let Some(mut conn) = self.registry.remove(token) else {
            return;
        };
        conn.mark_closed();

        if let Err(e) = self.mux.deregister(&mut conn.stream, token) {
            log_connection_error(&e);
        }

        debug!(conn_id = %token, peer = %conn.peer, "Connection closed");
    }

    fn release_all(&mut self) {
        for token in self.registry.tokens() {
            self.release(token);
        }

        self.deferred.clear();
        debug_assert!(self.registry.is_empty());

        if let Err(e) = self.mux.deregister(&mut self.listener, self.listener_token) {
            log_connection_error(&e);
        }
    }
}

/// What is left to do on a connection after servicing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    /// The socket reported `WouldBlock` or the connection stopped reading.
    Idle,
    /// The read budget ran out while data may still be waiting.
    Yielded,
}

/// Service one readiness event. Errors leave the connection in `Closing`.
fn handle_connection_event(conn: &mut Connection, event: &Event) -> Result<Progress> {
    let token = conn.token;

    if event.error {
        let source = match conn.stream.take_error() {
            Ok(Some(e)) | Err(e) => e,
            Ok(None) => io::Error::other("socket error reported"),
        };
        conn.abort();
        return Err(Error::ConnectionIo { token, source });
    }

    let mut progress = Progress::Idle;
    if event.readable && conn.is_reading() {
        progress = handle_readable(conn)?;
    }

    flush(conn)?;
    Ok(progress)
}

/// Read, answer complete lines, and flush, until the socket would block or
/// the read budget is spent.
fn handle_readable(conn: &mut Connection) -> Result<Progress> {
    let token = conn.token;

    for _ in 0..READ_BUDGET {
        if !conn.is_reading() {
            return Ok(Progress::Idle);
        }

        match conn.buffer.read_from(&mut conn.stream) {
            Ok(Fill::Read(_)) => conn.activate(),
            Ok(Fill::WouldBlock) => return Ok(Progress::Idle),
            Ok(Fill::Eof) => {
                // The buffer is not inspected after end-of-stream: a trailing
                // fragment never becomes a message.
                debug!(conn_id = %token, pending = conn.buffer.inbound_len(), "Peer closed");
                conn.buffer.discard_inbound();
                conn.begin_closing();
                return Ok(Progress::Idle);
            }
            Ok(Fill::Overflow) => {
                conn.abort();
                return Err(Error::BufferLimit {
                    token,
                    limit: conn.buffer.max_size(),
                });
            }
            Err(source) => {
                conn.abort();
                return Err(Error::ConnectionIo { token, source });
            }
        }

        process_lines(conn)?;
        flush(conn)?;
    }

    Ok(Progress::Yielded)
}

/// Answer every complete line in the inbound buffer.
fn process_lines(conn: &mut Connection) -> Result<()> {
    let token = conn.token;

    while let Some(raw) = conn.buffer.next_line() {
        let line = decode_line(&raw);
        let response = respond(&line);
        trace!(conn_id = %token, line = %line, "Echo");

        if let Err(LimitExceeded { limit }) = conn.buffer.queue(response.bytes()) {
            conn.abort();
            return Err(Error::BufferLimit { token, limit });
        }

        if response.closes_session() {
            debug!(conn_id = %token, "Client said goodbye");
            conn.buffer.discard_inbound();
            conn.begin_closing();
            break;
        }
    }

    Ok(())
}

/// Write as much queued output as the socket accepts.
fn flush(conn: &mut Connection) -> Result<()> {
    if !conn.buffer.has_pending_output() {
        return Ok(());
    }

    if let Err(source) = conn.buffer.drain_to(&mut conn.stream) {
        conn.abort();
        return Err(Error::ConnectionIo {
            token: conn.token,
            source,
        });
    }

    Ok(())
}

fn log_connection_error(err: &Error) {
    match err {
        Error::StaleToken { token } => {
            error!(conn_id = %token, "Registry and multiplexer out of sync");
            debug_assert!(false, "stale token {token}");
        }
        Error::ConnectionIo { token, source }
            if matches!(
                source.kind(),
                io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe
            ) =>
        {
            debug!(conn_id = %token, error = %source, "Connection reset");
        }
        Error::ConnectionIo { token, source } => {
            warn!(conn_id = %token, error = %source, "Connection I/O error");
        }
        Error::BufferLimit { token, limit } => {
            warn!(conn_id = %token, limit, "Buffer limit exceeded, closing");
        }
        other => warn!(error = %other, "Connection error"),
    }
}

/// Create a non-blocking TCP listener.
fn create_listener(addr: SocketAddr, backlog: i32) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::thread;

    fn test_config() -> Config {
        Config {
            port: 0,
            ..Config::default()
        }
    }

    /// Small reads so modest inputs span several read budgets.
    fn small_reads_config() -> Config {
        Config {
            port: 0,
            read_chunk_size: 16,
            max_buffer_size: 64 * 1024,
            ..Config::default()
        }
    }

    fn connect(addr: SocketAddr) -> std::net::TcpStream {
        let stream = std::net::TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
    }

    /// Read until the reactor closes the connection.
    fn read_to_close(stream: &mut std::net::TcpStream) -> Vec<u8> {
        let mut received = Vec::new();
        match stream.read_to_end(&mut received) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {}
            Err(e) => panic!("expected close, got {e}"),
        }
        received
    }

    /// Drive the reactor on this thread until `done` holds.
    fn pump_until(reactor: &mut Reactor, mut done: impl FnMut(&Reactor) -> bool) {
        let mut events = Vec::new();
        for _ in 0..500 {
            if done(&*reactor) {
                return;
            }
            reactor
                .turn(&mut events, Some(Duration::from_millis(10)))
                .unwrap();
        }
        panic!("reactor did not reach the expected state");
    }

    /// Every live connection is registered under its token with the interest
    /// it recorded, and nothing else is registered besides the listener.
    fn assert_registrations_match(reactor: &Reactor) {
        assert_eq!(reactor.mux.registrations(), reactor.connection_count() + 1);
        assert_eq!(
            reactor.mux.interest(reactor.listener_token),
            Some(Interest::READABLE)
        );
        for token in reactor.registry.tokens() {
            let conn = reactor.registry.get(token).unwrap();
            assert_ne!(conn.state(), ConnState::Closed);
            assert_eq!(reactor.mux.interest(token), Some(conn.interest));
        }
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let reactor = Reactor::bind(&test_config()).unwrap();
        assert_eq!(reactor.state(), ReactorState::Initializing);
        assert_ne!(reactor.local_addr().port(), 0);
        assert_eq!(reactor.connection_count(), 0);
    }

    #[test]
    fn test_bind_conflict_is_listener_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = Config {
            port: taken.local_addr().unwrap().port(),
            ..Config::default()
        };
        let err = Reactor::bind(&config).err().unwrap();
        assert!(matches!(err, Error::Listener { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_shutdown_before_run() {
        let reactor = Reactor::bind(&test_config()).unwrap();
        let handle = reactor.shutdown_handle();
        handle.shutdown();
        assert!(handle.is_requested());
        reactor.run().unwrap();
    }

    #[test]
    fn test_shutdown_while_serving() {
        let reactor = Reactor::bind(&test_config()).unwrap();
        let addr = reactor.local_addr();
        let handle = reactor.shutdown_handle();
        let server = thread::spawn(move || reactor.run());

        let mut client = std::net::TcpStream::connect(addr).unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        client.write_all(b"ping\n").unwrap();
        let mut reply = String::new();
        BufReader::new(&client).read_line(&mut reply).unwrap();
        assert_eq!(reply, "Echo: ping\n");

        handle.shutdown();
        server.join().unwrap().unwrap();

        // The live connection was closed during shutdown.
        let mut rest = String::new();
        let n = BufReader::new(&client).read_line(&mut rest).unwrap_or(0);
        assert_eq!(n, 0);
    }

    #[test]
    fn test_connection_limit() {
        let config = Config {
            port: 0,
            max_connections: 1,
            ..Config::default()
        };
        let reactor = Reactor::bind(&config).unwrap();
        let addr = reactor.local_addr();
        let handle = reactor.shutdown_handle();
        let server = thread::spawn(move || reactor.run());

        let mut first = std::net::TcpStream::connect(addr).unwrap();
        first
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        first.write_all(b"one\n").unwrap();
        let mut reply = String::new();
        BufReader::new(&first).read_line(&mut reply).unwrap();
        assert_eq!(reply, "Echo: one\n");

        // Over the limit: accepted, then dropped straight away.
        let second = std::net::TcpStream::connect(addr).unwrap();
        second
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut rest = String::new();
        let n = BufReader::new(&second).read_line(&mut rest).unwrap_or(0);
        assert_eq!(n, 0);

        handle.shutdown();
        server.join().unwrap().unwrap();
    }

    #[test]
    fn test_registrations_track_live_connections() {
        let config = Config {
            port: 0,
            max_connections: 2,
            max_buffer_size: 1024,
            read_chunk_size: 256,
            ..Config::default()
        };
        let mut reactor = Reactor::bind(&config).unwrap();
        let addr = reactor.local_addr();
        assert_registrations_match(&reactor);

        let _steady = connect(addr);
        pump_until(&mut reactor, |r| r.connection_count() == 1);
        assert_registrations_match(&reactor);

        // Farewell
        let mut farewell = connect(addr);
        pump_until(&mut reactor, |r| r.connection_count() == 2);
        assert_registrations_match(&reactor);
        farewell.write_all(b"bye\n").unwrap();
        pump_until(&mut reactor, |r| r.connection_count() == 1);
        assert_registrations_match(&reactor);
        assert_eq!(read_to_close(&mut farewell), b"Echo: bye\n");

        // End of stream
        let eof = connect(addr);
        pump_until(&mut reactor, |r| r.connection_count() == 2);
        eof.shutdown(std::net::Shutdown::Write).unwrap();
        pump_until(&mut reactor, |r| r.connection_count() == 1);
        assert_registrations_match(&reactor);

        // Reset
        let reset = socket2::Socket::from(connect(addr));
        pump_until(&mut reactor, |r| r.connection_count() == 2);
        reset.set_linger(Some(Duration::ZERO)).unwrap();
        drop(reset);
        pump_until(&mut reactor, |r| r.connection_count() == 1);
        assert_registrations_match(&reactor);

        // Unterminated input past the buffer cap
        let mut overflow = connect(addr);
        pump_until(&mut reactor, |r| r.connection_count() == 2);
        overflow.write_all(&[b'x'; 4096]).unwrap();
        pump_until(&mut reactor, |r| r.connection_count() == 1);
        assert_registrations_match(&reactor);

        // Over the connection limit
        let _full = connect(addr);
        pump_until(&mut reactor, |r| r.connection_count() == 2);
        let mut rejected = connect(addr);
        let mut events = Vec::new();
        for _ in 0..20 {
            reactor
                .turn(&mut events, Some(Duration::from_millis(10)))
                .unwrap();
        }
        assert!(read_to_close(&mut rejected).is_empty());
        assert_eq!(reactor.connection_count(), 2);
        assert_registrations_match(&reactor);

        reactor.release_all();
        assert!(reactor.registry.is_empty());
        assert_eq!(reactor.mux.registrations(), 0);
        assert_eq!(reactor.mux.interest(reactor.listener_token), None);
    }

    #[test]
    fn test_read_budget_yields_to_other_connections() {
        let mut reactor = Reactor::bind(&small_reads_config()).unwrap();
        let addr = reactor.local_addr();

        let mut heavy = connect(addr);
        pump_until(&mut reactor, |r| r.connection_count() == 1);
        let mut light = connect(addr);
        pump_until(&mut reactor, |r| r.connection_count() == 2);

        // 900 bytes at 16 bytes per read needs several read budgets.
        let lines: Vec<String> = (0..100).map(|i| format!("line-{i:03}")).collect();
        let payload: String = lines.iter().map(|line| format!("{line}\n")).collect();
        heavy.write_all(payload.as_bytes()).unwrap();
        light.write_all(b"ping\n").unwrap();
        thread::sleep(Duration::from_millis(50));

        let mut events = Vec::new();
        reactor
            .turn(&mut events, Some(Duration::from_secs(1)))
            .unwrap();
        assert_eq!(reactor.deferred.len(), 1);

        // Answered in the same pass: the reactor is not running while we read.
        let mut reply = String::new();
        BufReader::new(&light).read_line(&mut reply).unwrap();
        assert_eq!(reply, "Echo: ping\n");

        pump_until(&mut reactor, |r| r.deferred.is_empty());
        assert_registrations_match(&reactor);

        let expected: String = lines.iter().map(|line| format!("Echo: {line}\n")).collect();
        let mut received = vec![0u8; expected.len()];
        heavy.read_exact(&mut received).unwrap();
        assert_eq!(String::from_utf8(received).unwrap(), expected);
    }

    #[test]
    fn test_streaming_connection_deferred_once() {
        let mut reactor = Reactor::bind(&small_reads_config()).unwrap();
        let addr = reactor.local_addr();
        let stop = Arc::new(AtomicBool::new(false));

        let mut writer = std::net::TcpStream::connect(addr).unwrap();
        writer
            .set_write_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut reader = writer.try_clone().unwrap();

        let writer_stop = Arc::clone(&stop);
        let writer_thread = thread::spawn(move || {
            while !writer_stop.load(Ordering::Relaxed) {
                if writer.write_all(b"abcdefghij\n").is_err() {
                    break;
                }
            }
        });
        let reader_thread = thread::spawn(move || {
            let mut sink = [0u8; 4096];
            while let Ok(n) = reader.read(&mut sink) {
                if n == 0 {
                    break;
                }
            }
        });

        let mut events = Vec::new();
        let mut yielded_passes = 0;
        for _ in 0..1000 {
            reactor
                .turn(&mut events, Some(Duration::from_millis(10)))
                .unwrap();

            let mut queued: Vec<Token> = reactor.deferred.iter().copied().collect();
            queued.sort();
            queued.dedup();
            assert_eq!(queued.len(), reactor.deferred.len(), "token queued twice");
            assert!(reactor.deferred.len() <= reactor.connection_count());
            if !reactor.deferred.is_empty() {
                yielded_passes += 1;
            }
        }
        assert!(yielded_passes > 0);

        stop.store(true, Ordering::Relaxed);
        drop(reactor);
        writer_thread.join().unwrap();
        reader_thread.join().unwrap();
    }
}
