//! Stop-signal forwarding.
//!
//! Signals are delivered on a helper thread, which only flips the reactor's
//! shutdown flag and wakes it. All teardown still happens on the loop thread.

use crate::runtime::reactor::ShutdownHandle;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::io;
use std::thread;
use tracing::info;

/// Request reactor shutdown on SIGINT or SIGTERM.
pub fn forward_stop_signals(handle: ShutdownHandle) -> io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                info!(signal, "Stop signal received");
                handle.shutdown();
            }
        })?;

    Ok(())
}
