//! Protocol implementations.
//!
//! Each protocol is pure logic over complete messages; framing and I/O live
//! in the runtime.
//!
//! - `echo`: line echo with a `bye` farewell

pub mod echo;
