//! The container mount table

use crate::Result;
use crate::platform::Platform;
use nix::mount::MsFlags;
use std::path::{Path, PathBuf};

/// One entry of the mount table
///
/// Destinations are absolute paths inside the container, i.e. they are
/// resolved after the root pivot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub fstype: String,
    pub flags: MsFlags,
    pub options: Vec<String>,
}

impl MountSpec {
    #[must_use]
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        fstype: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            fstype: fstype.into(),
            flags: MsFlags::empty(),
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn flags(mut self, flags: MsFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    /// Options joined into the comma separated `data` argument of `mount(2)`
    #[must_use]
    pub fn data(&self) -> Option<String> {
        if self.options.is_empty() {
            None
        } else {
            Some(self.options.join(","))
        }
    }

    #[must_use]
    pub fn is_tmpfs(&self) -> bool {
        self.fstype == "tmpfs"
    }
}

/// Mount every entry in table order, creating destinations as needed
///
/// The first failing mount aborts the whole table.
pub fn apply<P: Platform + ?Sized>(platform: &P, mounts: &[MountSpec]) -> Result<()> {
    for m in mounts {
        tracing::debug!(
            source = %m.source.display(),
            destination = %m.destination.display(),
            fstype = %m.fstype,
            "mounting"
        );

        platform.create_dir_all(&m.destination)?;

        let data = m.data();
        platform.mount(
            Some(m.source.as_path()),
            &m.destination,
            Some(m.fstype.as_str()),
            m.flags,
            data.as_deref(),
        )?;
    }
    Ok(())
}

/// Destinations of all tmpfs entries, in table order
pub fn tmpfs_destinations(mounts: &[MountSpec]) -> impl Iterator<Item = &Path> {
    mounts
        .iter()
        .filter(|m| m.is_tmpfs())
        .map(|m| m.destination.as_path())
}
