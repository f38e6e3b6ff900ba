//! Recording fake of the platform primitives

use super::Platform;
use crate::isolation::devices::DeviceKind;
use crate::{FurnaceError, Result};
use nix::mount::MsFlags;
use nix::sched::CloneFlags;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// One recorded primitive invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Setsid,
    IgnoreChildSignal,
    Unshare(CloneFlags),
    Mount {
        source: Option<PathBuf>,
        target: PathBuf,
        fstype: Option<String>,
        flags: MsFlags,
        data: Option<String>,
    },
    PivotRoot(PathBuf, PathBuf),
    Chroot(PathBuf),
    Chdir(PathBuf),
    CreateDirAll(PathBuf),
    RemoveDir(PathBuf),
    MakeDeviceNode {
        path: PathBuf,
        kind: DeviceKind,
        mode: u32,
        dev: libc::dev_t,
    },
    SetMode(PathBuf, u32),
    Symlink(PathBuf, PathBuf),
    DetachUnmount(PathBuf),
    SetHostname(String),
    RunCommand(PathBuf, Vec<String>),
}

/// Primitive kinds that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Setsid,
    IgnoreChildSignal,
    Unshare,
    Mount,
    PivotRoot,
    MakeDeviceNode,
    SetHostname,
    RunCommand,
}

#[derive(Debug)]
pub struct FakePlatform {
    pub pid: i32,
    pub missing_namespaces: HashSet<String>,
    pub umask: u32,
    pub tmpfiles_present: bool,
    pub tmpfiles_output: Vec<u8>,
    pub fail_on: Option<Primitive>,
    pub calls: RefCell<Vec<Call>>,
    pub modes: RefCell<HashMap<PathBuf, u32>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            pid: 1,
            missing_namespaces: HashSet::new(),
            umask: 0o022,
            tmpfiles_present: false,
            tmpfiles_output: Vec::new(),
            fail_on: None,
            calls: RefCell::new(Vec::new()),
            modes: RefCell::new(HashMap::new()),
        }
    }
}

impl FakePlatform {
    pub fn without_namespace(mut self, name: &str) -> Self {
        self.missing_namespaces.insert(name.to_string());
        self
    }

    pub fn failing_on(mut self, primitive: Primitive) -> Self {
        self.fail_on = Some(primitive);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Final permission bits of a node, as the filesystem would report them
    pub fn mode_of(&self, path: &Path) -> Option<u32> {
        self.modes.borrow().get(path).copied()
    }

    /// Index of the first call matching `pred`
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.borrow().iter().position(pred)
    }

    fn record(&self, call: Call, primitive: Option<Primitive>) -> Result<()> {
        self.calls.borrow_mut().push(call);
        match primitive {
            Some(p) if self.fail_on == Some(p) => {
                Err(FurnaceError::Nix(nix::Error::EPERM))
            }
            _ => Ok(()),
        }
    }
}

impl Platform for FakePlatform {
    fn getpid(&self) -> i32 {
        self.pid
    }

    fn setsid(&self) -> Result<()> {
        self.record(Call::Setsid, Some(Primitive::Setsid))
    }

    fn ignore_child_signal(&self) -> Result<()> {
        self.record(Call::IgnoreChildSignal, Some(Primitive::IgnoreChildSignal))
    }

    fn namespace_available(&self, name: &str) -> bool {
        !self.missing_namespaces.contains(name)
    }

    fn unshare(&self, flags: CloneFlags) -> Result<()> {
        self.record(Call::Unshare(flags), Some(Primitive::Unshare))
    }

    fn mount(
        &self,
        source: Option<&Path>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> Result<()> {
        self.record(
            Call::Mount {
                source: source.map(Path::to_path_buf),
                target: target.to_path_buf(),
                fstype: fstype.map(str::to_string),
                flags,
                data: data.map(str::to_string),
            },
            Some(Primitive::Mount),
        )
    }

    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> Result<()> {
        self.record(
            Call::PivotRoot(new_root.to_path_buf(), put_old.to_path_buf()),
            Some(Primitive::PivotRoot),
        )
    }

    fn chroot(&self, path: &Path) -> Result<()> {
        self.record(Call::Chroot(path.to_path_buf()), None)
    }

    fn chdir(&self, path: &Path) -> Result<()> {
        self.record(Call::Chdir(path.to_path_buf()), None)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.record(Call::CreateDirAll(path.to_path_buf()), None)
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        self.record(Call::RemoveDir(path.to_path_buf()), None)
    }

    fn exists(&self, path: &Path) -> bool {
        self.tmpfiles_present && path == Path::new(crate::isolation::tmpfiles::TMPFILES_TOOL)
    }

    fn make_device_node(
        &self,
        path: &Path,
        kind: DeviceKind,
        mode: u32,
        dev: libc::dev_t,
    ) -> Result<()> {
        self.record(
            Call::MakeDeviceNode {
                path: path.to_path_buf(),
                kind,
                mode,
                dev,
            },
            Some(Primitive::MakeDeviceNode),
        )?;
        self.modes
            .borrow_mut()
            .insert(path.to_path_buf(), mode & !self.umask);
        Ok(())
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        self.record(Call::SetMode(path.to_path_buf(), mode), None)?;
        self.modes.borrow_mut().insert(path.to_path_buf(), mode);
        Ok(())
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        self.record(Call::Symlink(target.to_path_buf(), link.to_path_buf()), None)
    }

    fn detach_unmount(&self, path: &Path) -> Result<()> {
        self.record(Call::DetachUnmount(path.to_path_buf()), None)
    }

    fn set_hostname(&self, hostname: &str) -> Result<()> {
        self.record(
            Call::SetHostname(hostname.to_string()),
            Some(Primitive::SetHostname),
        )
    }

    fn run_command(&self, program: &Path, args: &[&str]) -> Result<Vec<u8>> {
        self.record(
            Call::RunCommand(
                program.to_path_buf(),
                args.iter().map(|a| (*a).to_string()).collect(),
            ),
            Some(Primitive::RunCommand),
        )?;
        Ok(self.tmpfiles_output.clone())
    }
}
