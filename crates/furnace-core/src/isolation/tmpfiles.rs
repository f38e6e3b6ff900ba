//! Pre-populating tmpfs mounts with systemd-tmpfiles

use crate::Result;
use crate::isolation::mounts::{MountSpec, tmpfs_destinations};
use crate::platform::Platform;
use std::path::Path;

/// Location of the tool inside the container root
pub const TMPFILES_TOOL: &str = "/bin/systemd-tmpfiles";

/// Run `systemd-tmpfiles --create` once per tmpfs mount
///
/// Returns whether the tool was found. When it is missing the
/// directories are left empty.
pub fn populate<P: Platform + ?Sized>(platform: &P, mounts: &[MountSpec]) -> Result<bool> {
    let tool = Path::new(TMPFILES_TOOL);
    if !platform.exists(tool) {
        tracing::warn!(
            tool = TMPFILES_TOOL,
            "could not run systemd-tmpfiles because it does not exist, tmpfs mounts will not be populated"
        );
        return Ok(false);
    }

    for dest in tmpfs_destinations(mounts) {
        let prefix = dest.to_string_lossy();
        let output = platform.run_command(tool, &["--create", "--prefix", &*prefix])?;
        if !output.is_empty() {
            tracing::debug!(
                prefix = %prefix,
                output = %String::from_utf8_lossy(&output).trim_end(),
                "systemd-tmpfiles output"
            );
        }
    }
    Ok(true)
}
