// src/process/signal.rs

//! Platform-specific interrupt delivery.
//!
//! On Unix a live child is sent `SIGINT` by pid. Elsewhere asynchronous
//! signals are not usable, so the supervisor falls back to a termination
//! request through [`Child::start_kill`].

use std::io;

use tokio::process::Child;

#[cfg(unix)]
pub fn interrupt_pid(pid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    match kill(Pid::from_raw(pid), Signal::SIGINT) {
        Ok(()) => Ok(()),
        // Already exited and reaped.
        Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from(e)),
    }
}

#[cfg(not(unix))]
pub fn interrupt_pid(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "interrupting a process by pid is not supported on this platform",
    ))
}

/// Interrupt a live child: `SIGINT` on Unix, a termination request
/// elsewhere.
#[cfg(unix)]
pub fn interrupt(child: &mut Child) -> io::Result<()> {
    match child.id() {
        Some(pid) => interrupt_pid(pid),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
pub fn interrupt(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}
