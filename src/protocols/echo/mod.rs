//! Echo protocol implementation.
//!
//! A line-oriented echo service:
//! - Client sends: `<line>\n`
//! - Server replies: `Echo: <line>\n`
//!
//! ## Protocol Format
//!
//! ```text
//! Request:  hello\n
//! Response: Echo: hello\n
//! ```
//!
//! A trailing `\r` before the newline is ignored, so `hello\r\n` is the same
//! request as `hello\n`.
//!
//! Special lines:
//! - `bye` (any case) - replied to like any other line, after which the
//!   session ends.
//!
//! The handler is pure: framing lives in the connection buffer and all I/O
//! lives in the reactor.

pub mod handler;

pub use handler::{decode_line, respond, Response};
