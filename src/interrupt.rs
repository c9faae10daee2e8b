//! SIGINT/SIGTERM handling.
//!
//! Once [`install`] has run, a signal no longer kills the process. It is
//! recorded and forwarded to the process group of the external command
//! currently running (if any). That command exits, the error unwinds through
//! the batch loop and the mount guard is dropped normally.

use crate::{MigrateError, Result};
use nix::libc::c_int;
use nix::sys::signal::{killpg, sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;
use std::io;
use std::process::Child;
use std::sync::atomic::{AtomicI32, Ordering};

/// Number of the first signal received, 0 while none has arrived.
static RECEIVED: AtomicI32 = AtomicI32::new(0);
/// Process group of the running child, 0 when there is none.
static CHILD_GROUP: AtomicI32 = AtomicI32::new(0);

extern "C" fn on_signal(signal: c_int) {
    let _ = RECEIVED.compare_exchange(0, signal, Ordering::SeqCst, Ordering::SeqCst);
    forward(signal);
}

// only async-signal-safe calls from here: atomics and kill(2)
fn forward(signal: c_int) {
    let group = CHILD_GROUP.load(Ordering::SeqCst);
    if group > 0 {
        if let Ok(signal) = Signal::try_from(signal) {
            let _ = killpg(Pid::from_raw(group), signal);
        }
    }
}

/// Route SIGINT and SIGTERM through the handler above.
pub fn install() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only touches atomics and calls killpg
        unsafe { sigaction(signal, &action) }.map_err(io::Error::from)?;
    }
    tracing::debug!("Installed SIGINT/SIGTERM handler");
    Ok(())
}

pub fn received() -> Option<i32> {
    match RECEIVED.load(Ordering::SeqCst) {
        0 => None,
        signal => Some(signal),
    }
}

/// `Err(Interrupted)` once a signal has arrived.
pub fn check() -> Result<()> {
    match received() {
        Some(signal) => Err(MigrateError::Interrupted(signal)),
        None => Ok(()),
    }
}

/// Marks `child` as the target for forwarded signals until dropped.
///
/// The child must have been spawned as a process group leader
/// (`CommandExt::process_group(0)`).
pub struct TrackedChild(());

pub fn track(child: &Child) -> TrackedChild {
    let group = i32::try_from(child.id()).unwrap_or(0);
    CHILD_GROUP.store(group, Ordering::SeqCst);

    // a signal that landed between spawn and here was not forwarded
    if let Some(signal) = received() {
        forward(signal);
    }
    TrackedChild(())
}

impl Drop for TrackedChild {
    fn drop(&mut self) {
        CHILD_GROUP.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_signal_by_default() {
        assert_eq!(received(), None);
        assert!(check().is_ok());
    }
}
