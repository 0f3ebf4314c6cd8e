//! Echo protocol handler.

/// Prefix written in front of every echoed line.
pub const ECHO_PREFIX: &str = "Echo: ";

/// Line that ends the session.
pub const FAREWELL: &str = "bye";

/// Outcome of handling one complete line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Send the reply and keep the session open.
    Reply(Vec<u8>),
    /// Send the reply, then terminate the session.
    ReplyAndClose(Vec<u8>),
}

impl Response {
    /// Bytes to queue for the peer.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Response::Reply(bytes) | Response::ReplyAndClose(bytes) => bytes,
        }
    }

    /// Whether the session ends once the reply is sent.
    pub fn closes_session(&self) -> bool {
        matches!(self, Response::ReplyAndClose(_))
    }
}

/// Map one complete line (terminator already stripped) to its reply.
pub fn respond(line: &str) -> Response {
    let mut reply = Vec::with_capacity(ECHO_PREFIX.len() + line.len() + 1);
    reply.extend_from_slice(ECHO_PREFIX.as_bytes());
    reply.extend_from_slice(line.as_bytes());
    reply.push(b'\n');

    if line.trim_ascii().eq_ignore_ascii_case(FAREWELL) {
        Response::ReplyAndClose(reply)
    } else {
        Response::Reply(reply)
    }
}

/// Decode a raw line and strip an optional trailing `\r`.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn decode_line(raw: &[u8]) -> std::borrow::Cow<'_, str> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}
