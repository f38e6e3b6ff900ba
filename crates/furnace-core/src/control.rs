//! Readiness/shutdown handshake with the controller

use crate::{FurnaceError, Result};
use nix::fcntl::{FcntlArg, FdFlag, fcntl};
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::os::unix::io::{FromRawFd, RawFd};

/// Marker written once setup has completed
pub const READY_MARKER: &[u8; 3] = b"RDY";

/// The pair of pipe ends handed to us by the controller
#[derive(Debug)]
pub struct ControlChannel<R = File, W = File> {
    /// Closed by the controller to stop the container
    read: R,
    /// Receives the ready marker
    write: W,
    ready_sent: bool,
}

impl ControlChannel {
    /// Take ownership of inherited descriptors
    ///
    /// Both are marked close-on-exec so helper programs never hold the
    /// controller's pipe open.
    ///
    /// # Safety
    /// Both descriptors must be open, owned by nobody else in this process,
    /// and `read` must be readable and `write` writable.
    #[allow(unsafe_code)]
    pub unsafe fn from_raw_fds(read: RawFd, write: RawFd) -> Result<Self> {
        // SAFETY: upheld by the caller
        let (read, write) = unsafe { (File::from_raw_fd(read), File::from_raw_fd(write)) };
        for file in [&read, &write] {
            fcntl(file, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)).map_err(|e| {
                FurnaceError::Control(format!("failed to set FD_CLOEXEC on control pipe: {e}"))
            })?;
        }
        Ok(Self::new(read, write))
    }
}

impl<R: Read, W: Write> ControlChannel<R, W> {
    pub const fn new(read: R, write: W) -> Self {
        Self {
            read,
            write,
            ready_sent: false,
        }
    }

    /// Tell the controller the container is up
    ///
    /// Fails if the marker was already sent.
    pub fn signal_ready(&mut self) -> Result<()> {
        if self.ready_sent {
            return Err(FurnaceError::Control("ready marker already sent".into()));
        }
        self.write.write_all(READY_MARKER)?;
        self.write.flush()?;
        self.ready_sent = true;
        Ok(())
    }

    #[must_use]
    pub const fn ready_sent(&self) -> bool {
        self.ready_sent
    }

    /// Block until the controller closes its end (or writes anything)
    ///
    /// Whatever is read is discarded.
    pub fn wait_for_shutdown(&mut self) -> Result<()> {
        let mut buf = [0u8; 1];
        loop {
            match self.read.read(&mut buf) {
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    return Err(FurnaceError::Control(format!(
                        "control pipe read failed: {e}"
                    )));
                }
            }
        }
    }

    /// Give back the underlying endpoints
    pub fn into_inner(self) -> (R, W) {
        (self.read, self.write)
    }
}
