//! Signal handling for watch mode
//!
//! Termination signals only raise the cancellation flag. The watch loop
//! notices it between passes, so a pass in progress always completes and
//! repeated signals never kill the process mid-write.

use dotsync_core::CancelToken;

#[cfg(unix)]
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
#[cfg(not(unix))]
use signal_hook::consts::{SIGINT, SIGTERM};

#[cfg(unix)]
const SIGNALS: &[i32] = &[SIGINT, SIGTERM, SIGHUP];
#[cfg(not(unix))]
const SIGNALS: &[i32] = &[SIGINT, SIGTERM];

/// Route termination signals to `cancel`.
pub fn install(cancel: &CancelToken) -> std::io::Result<()> {
    for &signal in SIGNALS {
        signal_hook::flag::register(signal, cancel.flag())?;
    }
    Ok(())
}
