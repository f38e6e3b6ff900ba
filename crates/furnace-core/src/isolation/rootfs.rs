//! Root filesystem switch with `pivot_root`

use crate::Result;
use crate::platform::Platform;
use nix::mount::MsFlags;
use std::path::{Path, PathBuf};

/// Directory under the new root that receives the host root during the pivot
pub const OLD_ROOT: &str = "old_root";

/// Make `/` non-propagating, then pivot into `root_dir`
///
/// Must run inside a private mount namespace and before anything is
/// mounted into the new root. The host root stays reachable at
/// `/old_root` until [`detach_old_root`].
pub fn pivot<P: Platform + ?Sized>(platform: &P, root_dir: &Path) -> Result<()> {
    tracing::debug!(root = %root_dir.display(), "setting up root mount");

    // Slave: host mount events still reach us, ours never leak out
    platform.mount(
        Some(Path::new("none")),
        Path::new("/"),
        None,
        MsFlags::MS_REC | MsFlags::MS_SLAVE,
        None,
    )?;

    platform.create_dir_all(&root_dir.join(OLD_ROOT))?;
    platform.chdir(root_dir)?;

    tracing::debug!(root = %root_dir.display(), "pivot_root");
    platform.pivot_root(Path::new("."), Path::new(OLD_ROOT))?;
    platform.chroot(Path::new("."))?;

    Ok(())
}

/// Lazily unmount the host root and remove its mount point
pub fn detach_old_root<P: Platform + ?Sized>(platform: &P) -> Result<()> {
    let old_root = PathBuf::from("/").join(OLD_ROOT);
    tracing::debug!(path = %old_root.display(), "detaching old root");

    platform.detach_unmount(&old_root)?;
    platform.remove_dir(&old_root)?;
    Ok(())
}
