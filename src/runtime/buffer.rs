//! Per-connection byte buffers.
//!
//! Each connection owns two independent regions:
//! - **inbound**: bytes read from the socket that have not yet formed a
//!   complete line. Partial lines stay buffered until the terminator arrives.
//! - **outbound**: reply bytes the socket has not accepted yet.
//!
//! Both regions grow on demand up to a configured cap. Crossing the cap is
//! reported to the caller, which closes the connection rather than letting a
//! slow or hostile peer grow memory without bound.

use bytes::{Buf, BytesMut};
use std::io::{self, Read, Write};

/// Result of one read from a transport into the inbound region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// This many bytes were appended.
    Read(usize),
    /// The transport has no data right now. Not an error.
    WouldBlock,
    /// The peer closed its side of the stream.
    Eof,
    /// The inbound region grew past its cap.
    Overflow,
}

/// Result of draining the outbound region to a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Every queued byte was written.
    Complete,
    /// The transport stopped accepting bytes before the region emptied.
    Pending,
}

/// Error returned when queueing output would exceed the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitExceeded {
    pub limit: usize,
}

/// Inbound and outbound byte regions for one connection.
#[derive(Debug)]
pub struct ConnectionBuffer {
    inbound: BytesMut,
    outbound: BytesMut,
    max_size: usize,
    read_chunk: usize,
}

impl ConnectionBuffer {
    /// Create empty regions.
    ///
    /// # Arguments
    /// * `max_size` - Cap for each region, in bytes
    /// * `read_chunk` - Bytes requested per read call
    pub fn new(max_size: usize, read_chunk: usize) -> Self {
        Self {
            inbound: BytesMut::with_capacity(read_chunk),
            outbound: BytesMut::new(),
            max_size,
            read_chunk,
        }
    }

    /// Perform one read from `reader` into the inbound region.
    ///
    /// Interrupted reads are retried. Readiness notifications are
    /// edge-triggered, so callers keep reading until `WouldBlock`.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> io::Result<Fill> {
        let start = self.inbound.len();
        self.inbound.resize(start + self.read_chunk, 0);

        let result = loop {
            match reader.read(&mut self.inbound[start..]) {
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };

        match result {
            Ok(n) => {
                self.inbound.truncate(start + n);
                if n == 0 {
                    Ok(Fill::Eof)
                } else if self.inbound.len() > self.max_size {
                    Ok(Fill::Overflow)
                } else {
                    Ok(Fill::Read(n))
                }
            }
            Err(e) => {
                self.inbound.truncate(start);
                if e.kind() == io::ErrorKind::WouldBlock {
                    Ok(Fill::WouldBlock)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Split off the next complete line, without its `\n` terminator.
    ///
    /// Returns `None` while only an incomplete fragment is buffered; the
    /// fragment is kept for the next read.
    pub fn next_line(&mut self) -> Option<BytesMut> {
        let pos = self.inbound.iter().position(|&b| b == b'\n')?;
        let mut line = self.inbound.split_to(pos + 1);
        line.truncate(pos);
        Some(line)
    }

    /// Append reply bytes to the outbound region.
    pub fn queue(&mut self, data: &[u8]) -> Result<(), LimitExceeded> {
        if self.outbound.len() + data.len() > self.max_size {
            return Err(LimitExceeded {
                limit: self.max_size,
            });
        }
        self.outbound.extend_from_slice(data);
        Ok(())
    }

    /// Write as much of the outbound region as `writer` accepts.
    pub fn drain_to<W: Write>(&mut self, writer: &mut W) -> io::Result<Drain> {
        while !self.outbound.is_empty() {
            match writer.write(&self.outbound) {
                Ok(0) => {
                    return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0"));
                }
                Ok(n) => self.outbound.advance(n),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Drain::Pending),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(Drain::Complete)
    }

    /// Whether reply bytes are still waiting for the transport.
    pub fn has_pending_output(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Bytes buffered inbound (incomplete line data).
    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    /// Bytes buffered outbound.
    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    /// Drop any buffered inbound bytes.
    pub fn discard_inbound(&mut self) {
        self.inbound.clear();
    }

    /// Drop any queued outbound bytes.
    pub fn discard_outbound(&mut self) {
        self.outbound.clear();
    }

    /// Cap applied to each region.
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
