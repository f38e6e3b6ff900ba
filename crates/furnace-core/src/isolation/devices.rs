//! Device nodes under `/dev`

use crate::Result;
use crate::config::dev_path;
use crate::platform::Platform;
use std::path::Path;

/// Mode of the loop devices and their control node
pub const LOOP_MODE: u32 = 0o660;
/// Number of numbered loop devices (`loop0`..`loop7`)
pub const LOOP_DEVICE_COUNT: u64 = 8;
const LOOP_CONTROL: (u64, u64) = (10, 237);
const LOOP_MAJOR: u64 = 7;
/// devpts is mounted with `newinstance`, so `/dev/ptmx` must point into it
pub const PTMX_TARGET: &str = "pts/ptmx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Char,
    Block,
}

/// A special file to create in `/dev`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNodeSpec {
    pub name: String,
    pub major: u64,
    pub minor: u64,
    pub mode: u32,
    pub kind: DeviceKind,
}

impl DeviceNodeSpec {
    #[must_use]
    pub fn char(name: impl Into<String>, major: u64, minor: u64, mode: u32) -> Self {
        Self {
            name: name.into(),
            major,
            minor,
            mode,
            kind: DeviceKind::Char,
        }
    }

    #[must_use]
    pub fn block(name: impl Into<String>, major: u64, minor: u64, mode: u32) -> Self {
        Self {
            kind: DeviceKind::Block,
            ..Self::char(name, major, minor, mode)
        }
    }

    /// Packed device number for `mknod(2)`
    #[must_use]
    pub fn dev(&self) -> libc::dev_t {
        nix::sys::stat::makedev(self.major, self.minor)
    }
}

/// `loop-control` followed by `loop0`..`loop7`
#[must_use]
pub fn loop_devices() -> Vec<DeviceNodeSpec> {
    let (major, minor) = LOOP_CONTROL;
    let mut nodes = vec![DeviceNodeSpec::char("loop-control", major, minor, LOOP_MODE)];
    nodes.extend(
        (0..LOOP_DEVICE_COUNT)
            .map(|i| DeviceNodeSpec::block(format!("loop{i}"), LOOP_MAJOR, i, LOOP_MODE)),
    );
    nodes
}

/// Create one node and force its mode
///
/// `mknod` applies the umask to the requested mode, so the mode is set
/// again with an explicit chmod.
pub fn create_node<P: Platform + ?Sized>(platform: &P, spec: &DeviceNodeSpec) -> Result<()> {
    let path = dev_path(&spec.name);
    tracing::trace!(
        path = %path.display(),
        major = spec.major,
        minor = spec.minor,
        kind = ?spec.kind,
        "mknod"
    );
    platform.make_device_node(&path, spec.kind, spec.mode, spec.dev())?;
    platform.set_mode(&path, spec.mode)?;
    Ok(())
}

/// Create the fixed device table, then the loop devices, then the
/// `/dev/ptmx` link into the private devpts instance
pub fn create_all<P: Platform + ?Sized>(platform: &P, devices: &[DeviceNodeSpec]) -> Result<()> {
    for spec in devices {
        create_node(platform, spec)?;
    }
    let loops = loop_devices();
    for spec in &loops {
        create_node(platform, spec)?;
    }
    tracing::debug!(count = devices.len() + loops.len(), "device nodes created");

    platform.symlink(Path::new(PTMX_TARGET), &dev_path("ptmx"))?;
    Ok(())
}
