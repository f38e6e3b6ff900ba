//! Platform primitives
//!
//! Every OS operation the init sequence performs goes through [`Platform`],
//! so the sequence itself is plain data plus ordering and can be driven
//! against a fake in tests.

mod linux;
#[cfg(test)]
pub(crate) mod testing;

pub use self::linux::LinuxPlatform;

use crate::Result;
use crate::isolation::devices::DeviceKind;
use nix::mount::MsFlags;
use nix::sched::CloneFlags;
use std::path::Path;

/// Narrow interface over the syscalls used by PID 1
pub trait Platform {
    /// Own process id as seen from inside the PID namespace (never cached)
    fn getpid(&self) -> i32;

    /// Start a new session with this process as leader
    fn setsid(&self) -> Result<()>;

    /// Set SIGCHLD to an explicit SIG_IGN so the kernel discards dead children
    fn ignore_child_signal(&self) -> Result<()>;

    /// Whether the kernel exposes `/proc/self/ns/<name>`
    fn namespace_available(&self, name: &str) -> bool;

    /// Apply a set of namespace flags in a single `unshare(2)`
    fn unshare(&self, flags: CloneFlags) -> Result<()>;

    fn mount(
        &self,
        source: Option<&Path>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> Result<()>;

    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> Result<()>;

    fn chroot(&self, path: &Path) -> Result<()>;

    fn chdir(&self, path: &Path) -> Result<()>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    fn remove_dir(&self, path: &Path) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// `mknod(2)`; the resulting mode is filtered through the umask
    fn make_device_node(&self, path: &Path, kind: DeviceKind, mode: u32, dev: libc::dev_t)
        -> Result<()>;

    /// Set permission bits exactly, ignoring the umask
    fn set_mode(&self, path: &Path, mode: u32) -> Result<()>;

    /// Create `link` pointing at `target`
    fn symlink(&self, target: &Path, link: &Path) -> Result<()>;

    /// Lazy unmount (`MNT_DETACH`)
    fn detach_unmount(&self, path: &Path) -> Result<()>;

    fn set_hostname(&self, hostname: &str) -> Result<()>;

    /// Run a program to completion, returning its combined stdout and stderr
    fn run_command(&self, program: &Path, args: &[&str]) -> Result<Vec<u8>>;
}
