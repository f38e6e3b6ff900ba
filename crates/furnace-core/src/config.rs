//! Container configuration and the fixed setup tables

use crate::isolation::devices::DeviceNodeSpec;
use crate::isolation::mounts::MountSpec;
use crate::isolation::namespace::NamespaceSpec;
use crate::{FurnaceError, Result};
use nix::mount::MsFlags;
use nix::sched::CloneFlags;
use serde::{Deserialize, Serialize};
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

/// Hostname every container gets once setup completes
pub const HOSTNAME: &str = "furnace";

/// Immutable per-run configuration of the container being initialised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Absolute path of the directory that becomes `/`
    pub root_dir: PathBuf,
    /// Unshare the network namespace too
    pub isolate_networking: bool,
}

impl ContainerConfig {
    /// Create a config, rejecting relative roots
    pub fn new(root_dir: impl Into<PathBuf>, isolate_networking: bool) -> Result<Self> {
        let root_dir = root_dir.into();
        if !root_dir.is_absolute() {
            return Err(FurnaceError::Config(format!(
                "root directory must be absolute: {}",
                root_dir.display()
            )));
        }
        Ok(Self {
            root_dir,
            isolate_networking,
        })
    }
}

/// Verbosity requested by the controller
///
/// Accepts level names as well as the numeric 10/20/30/40/50 scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogLevel {
    Name(String),
    Numeric(u32),
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    #[must_use]
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Numeric(n) => match *n {
                0..=9 => "trace",
                10..=19 => "debug",
                20..=29 => "info",
                30..=39 => "warn",
                _ => "error",
            },
            Self::Name(name) => match name.to_ascii_lowercase().as_str() {
                "trace" => "trace",
                "debug" => "debug",
                "warn" | "warning" => "warn",
                "error" | "critical" | "fatal" => "error",
                _ => "info",
            },
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Name("info".into())
    }
}

const fn default_isolate_networking() -> bool {
    true
}

/// The serialized argument block passed by the controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupArgs {
    pub root_dir: PathBuf,
    pub control_read: RawFd,
    pub control_write: RawFd,
    #[serde(default)]
    pub loglevel: LogLevel,
    #[serde(default = "default_isolate_networking")]
    pub isolate_networking: bool,
}

impl StartupArgs {
    /// Parse the JSON argument block
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate and resolve into the container config
    ///
    /// The root is canonicalized here, while the host filesystem is still
    /// reachable.
    pub fn container_config(&self) -> Result<ContainerConfig> {
        if self.control_read < 0 || self.control_write < 0 {
            return Err(FurnaceError::Config(format!(
                "invalid control descriptors: read={} write={}",
                self.control_read, self.control_write
            )));
        }
        if !self.root_dir.is_absolute() {
            return Err(FurnaceError::Config(format!(
                "root directory must be absolute: {}",
                self.root_dir.display()
            )));
        }
        let root_dir = std::fs::canonicalize(&self.root_dir).map_err(|e| {
            FurnaceError::Config(format!(
                "cannot resolve root directory {}: {e}",
                self.root_dir.display()
            ))
        })?;
        ContainerConfig::new(root_dir, self.isolate_networking)
    }
}

/// The constant tables the setup sequence works from
#[derive(Debug, Clone)]
pub struct ContainerTables {
    pub namespaces: Vec<NamespaceSpec>,
    pub mounts: Vec<MountSpec>,
    pub devices: Vec<DeviceNodeSpec>,
    pub hostname: String,
}

impl ContainerTables {
    /// Tables for a minimal functioning container root
    #[must_use]
    pub fn standard() -> Self {
        Self {
            namespaces: standard_namespaces(),
            mounts: standard_mounts(),
            devices: standard_devices(),
            hostname: HOSTNAME.to_string(),
        }
    }
}

impl Default for ContainerTables {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_namespaces() -> Vec<NamespaceSpec> {
    vec![
        NamespaceSpec::new("ipc", CloneFlags::CLONE_NEWIPC),
        NamespaceSpec::new("mnt", CloneFlags::CLONE_NEWNS),
        NamespaceSpec::new("net", CloneFlags::CLONE_NEWNET),
        NamespaceSpec::new("pid", CloneFlags::CLONE_NEWPID),
        NamespaceSpec::new("uts", CloneFlags::CLONE_NEWUTS),
    ]
}

fn standard_mounts() -> Vec<MountSpec> {
    let hardened = MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC | MsFlags::MS_NODEV;
    vec![
        MountSpec::new("proc", "/proc", "proc").flags(hardened),
        MountSpec::new("sysfs", "/sys", "sysfs").flags(hardened | MsFlags::MS_RDONLY),
        MountSpec::new("tmpfs", "/dev", "tmpfs")
            .flags(MsFlags::MS_NOSUID | MsFlags::MS_STRICTATIME)
            .option("mode=755"),
        // parent /dev must come first
        MountSpec::new("devpts", "/dev/pts", "devpts")
            .flags(MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC)
            .option("newinstance")
            .option("ptmxmode=0666")
            .option("mode=0620"),
        MountSpec::new("shm", "/dev/shm", "tmpfs")
            .flags(hardened)
            .option("mode=1777"),
        MountSpec::new("mqueue", "/dev/mqueue", "mqueue").flags(hardened),
        MountSpec::new("tmpfs", "/tmp", "tmpfs")
            .flags(MsFlags::MS_NOSUID | MsFlags::MS_NODEV)
            .option("mode=1777"),
        MountSpec::new("tmpfs", "/run", "tmpfs")
            .flags(MsFlags::MS_NOSUID | MsFlags::MS_NODEV)
            .option("mode=755"),
    ]
}

fn standard_devices() -> Vec<DeviceNodeSpec> {
    vec![
        DeviceNodeSpec::char("null", 1, 3, 0o666),
        DeviceNodeSpec::char("zero", 1, 5, 0o666),
        DeviceNodeSpec::char("full", 1, 7, 0o666),
        DeviceNodeSpec::char("random", 1, 8, 0o666),
        DeviceNodeSpec::char("urandom", 1, 9, 0o666),
        DeviceNodeSpec::char("tty", 5, 0, 0o666),
        DeviceNodeSpec::char("console", 5, 1, 0o666),
    ]
}

/// Path of a device node inside the container's `/dev`
#[must_use]
pub fn dev_path(name: &str) -> PathBuf {
    Path::new("/dev").join(name)
}
