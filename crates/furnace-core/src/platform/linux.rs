//! nix-backed implementation of the platform primitives

use super::Platform;
use crate::isolation::devices::DeviceKind;
use crate::{FurnaceError, Result};
use nix::fcntl::OFlag;
use nix::mount::{MntFlags, MsFlags};
use nix::sched::CloneFlags;
use nix::sys::signal::{SigHandler, Signal};
use nix::sys::stat::{Mode, SFlag};
use std::fs::File;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Stdio};

/// Procfs directory listing the namespace kinds of the current process
const PROC_SELF_NS: &str = "/proc/self/ns";

/// The real thing: every call is a syscall on the running kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxPlatform;

impl LinuxPlatform {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Platform for LinuxPlatform {
    fn getpid(&self) -> i32 {
        // glibc stopped caching getpid(), and nix calls straight into libc
        nix::unistd::getpid().as_raw()
    }

    fn setsid(&self) -> Result<()> {
        nix::unistd::setsid()
            .map_err(|e| FurnaceError::Session(format!("setsid failed: {e}")))?;
        Ok(())
    }

    fn ignore_child_signal(&self) -> Result<()> {
        // SAFETY: SigIgn installs no handler code, so nothing runs in signal context.
        let previous = unsafe { nix::sys::signal::signal(Signal::SIGCHLD, SigHandler::SigIgn) }
            .map_err(|e| FurnaceError::Signal(format!("failed to ignore SIGCHLD: {e}")))?;
        tracing::trace!(?previous, "replaced SIGCHLD disposition");
        Ok(())
    }

    fn namespace_available(&self, name: &str) -> bool {
        Path::new(PROC_SELF_NS).join(name).exists()
    }

    fn unshare(&self, flags: CloneFlags) -> Result<()> {
        nix::sched::unshare(flags).map_err(|e| {
            FurnaceError::Namespace(format!("failed to unshare namespaces {flags:?}: {e}"))
        })
    }

    fn mount(
        &self,
        source: Option<&Path>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> Result<()> {
        nix::mount::mount(source, target, fstype, flags, data).map_err(|e| {
            FurnaceError::Mount(format!(
                "failed to mount {} ({}) on {}: {e}",
                source.map_or_else(|| "none".into(), |s| s.display().to_string()),
                fstype.unwrap_or("none"),
                target.display(),
            ))
        })
    }

    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> Result<()> {
        nix::unistd::pivot_root(new_root, put_old).map_err(|e| {
            FurnaceError::Pivot(format!(
                "pivot_root({}, {}) failed: {e}",
                new_root.display(),
                put_old.display()
            ))
        })
    }

    fn chroot(&self, path: &Path) -> Result<()> {
        nix::unistd::chroot(path)
            .map_err(|e| FurnaceError::Pivot(format!("chroot to {} failed: {e}", path.display())))
    }

    fn chdir(&self, path: &Path) -> Result<()> {
        nix::unistd::chdir(path)
            .map_err(|e| FurnaceError::Pivot(format!("chdir to {} failed: {e}", path.display())))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|e| {
            FurnaceError::Mount(format!("failed to create {}: {e}", path.display()))
        })
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        std::fs::remove_dir(path).map_err(|e| {
            FurnaceError::Pivot(format!("failed to remove {}: {e}", path.display()))
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn make_device_node(
        &self,
        path: &Path,
        kind: DeviceKind,
        mode: u32,
        dev: libc::dev_t,
    ) -> Result<()> {
        let sflag = match kind {
            DeviceKind::Char => SFlag::S_IFCHR,
            DeviceKind::Block => SFlag::S_IFBLK,
        };
        nix::sys::stat::mknod(path, sflag, Mode::from_bits_truncate(mode), dev).map_err(|e| {
            FurnaceError::Device(format!("mknod {} failed: {e}", path.display()))
        })
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
            FurnaceError::Device(format!(
                "failed to chmod {} to {mode:o}: {e}",
                path.display()
            ))
        })
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        std::os::unix::fs::symlink(target, link).map_err(|e| {
            FurnaceError::Device(format!(
                "failed to link {} -> {}: {e}",
                link.display(),
                target.display()
            ))
        })
    }

    fn detach_unmount(&self, path: &Path) -> Result<()> {
        nix::mount::umount2(path, MntFlags::MNT_DETACH).map_err(|e| {
            FurnaceError::Mount(format!("umount2 failed for {}: {e}", path.display()))
        })
    }

    fn set_hostname(&self, hostname: &str) -> Result<()> {
        nix::unistd::sethostname(hostname).map_err(|e| {
            FurnaceError::Hostname(format!("sethostname({hostname}) failed: {e}"))
        })
    }

    fn run_command(&self, program: &Path, args: &[&str]) -> Result<Vec<u8>> {
        let failed = |e: &dyn std::fmt::Display| {
            FurnaceError::Tmpfiles(format!("failed to execute {}: {e}", program.display()))
        };

        // stdout and stderr share one pipe so the output keeps its order
        let (out_rx, out_tx) = nix::unistd::pipe2(OFlag::O_CLOEXEC).map_err(|e| failed(&e))?;
        let err_tx = out_tx.try_clone().map_err(|e| failed(&e))?;

        // the Command temporary drops our copies of the write end, so the
        // read below sees EOF once the child exits
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(out_tx))
            .stderr(Stdio::from(err_tx))
            .spawn()
            .map_err(|e| failed(&e))?;

        let mut output = Vec::new();
        File::from(out_rx)
            .read_to_end(&mut output)
            .map_err(|e| failed(&e))?;

        let status = match child.wait() {
            Ok(status) => status,
            // SIGCHLD is ignored once reaping is on, so the kernel already
            // discarded the exit status; there is nothing left to check
            Err(e) if e.raw_os_error() == Some(libc::ECHILD) => {
                tracing::trace!(program = %program.display(), "exit status reaped by kernel");
                return Ok(output);
            }
            Err(e) => return Err(failed(&e)),
        };

        if !status.success() {
            return Err(FurnaceError::Tmpfiles(format!(
                "{} exited with {}: {}",
                program.display(),
                status,
                String::from_utf8_lossy(&output).trim_end()
            )));
        }

        Ok(output)
    }
}
