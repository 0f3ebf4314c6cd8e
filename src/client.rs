//! Reference client for the echo server.
//!
//! Opens a non-blocking connection, polls until the connection is
//! established (bounded retries with a short sleep), then switches to
//! blocking mode for simple line-at-a-time exchanges.

use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection did not complete within the allowed attempts.
    #[error("connection to {addr} not established after {attempts} attempts")]
    ConnectTimeout { addr: SocketAddr, attempts: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Connection establishment options.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Completion checks before giving up.
    pub max_attempts: u32,
    /// Sleep between completion checks.
    pub retry_interval: Duration,
    /// Read timeout once connected. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            retry_interval: Duration::from_millis(20),
            read_timeout: Some(Duration::from_secs(5)),
        }
    }
}

/// Blocking line client.
pub struct EchoClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    peer: SocketAddr,
}

impl EchoClient {
    /// Connect to `addr`.
    pub fn connect(addr: SocketAddr, options: &ConnectOptions) -> Result<Self, ClientError> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_nonblocking(true)?;

        match socket.connect(&addr.into()) {
            Ok(()) => {}
            Err(ref e) if connect_in_progress(e) => {}
            Err(e) => return Err(e.into()),
        }

        wait_connected(&socket, addr, options)?;

        socket.set_nonblocking(false)?;
        socket.set_read_timeout(options.read_timeout)?;

        let writer: TcpStream = socket.into();
        let reader = BufReader::new(writer.try_clone()?);

        Ok(Self {
            reader,
            writer,
            peer: addr,
        })
    }

    /// Address of the server.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Send one line. The `\n` terminator is appended.
    pub fn send_line(&mut self, line: &str) -> Result<(), ClientError> {
        let mut message = Vec::with_capacity(line.len() + 1);
        message.extend_from_slice(line.as_bytes());
        message.push(b'\n');
        self.send_raw(&message)
    }

    /// Send bytes exactly as given, without framing.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        trace!(peer = %self.peer, len = bytes.len(), "Sent");
        Ok(())
    }

    /// Read one response line, without its terminator.
    ///
    /// Returns `None` once the server has closed the connection.
    pub fn read_line(&mut self) -> Result<Option<String>, ClientError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Send one line and read one response.
    pub fn exchange(&mut self, line: &str) -> Result<Option<String>, ClientError> {
        self.send_line(line)?;
        self.read_line()
    }

    /// Close both directions of the connection.
    pub fn shutdown(self) -> Result<(), ClientError> {
        match self.writer.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Already closed by the server.
            Err(ref e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn connect_in_progress(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EINPROGRESS) || e.kind() == io::ErrorKind::WouldBlock
}

/// Poll a non-blocking connect until it completes, fails, or runs out of
/// attempts.
fn wait_connected(
    socket: &Socket,
    addr: SocketAddr,
    options: &ConnectOptions,
) -> Result<(), ClientError> {
    for attempt in 1..=options.max_attempts {
        if let Some(e) = socket.take_error()? {
            return Err(e.into());
        }

        match socket.peer_addr() {
            Ok(_) => {
                debug!(peer = %addr, attempt, "Connected");
                return Ok(());
            }
            Err(ref e) if e.kind() == io::ErrorKind::NotConnected => {
                trace!(peer = %addr, attempt, "Connecting");
                thread::sleep(options.retry_interval);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ClientError::ConnectTimeout {
        addr,
        attempts: options.max_attempts,
    })
}
