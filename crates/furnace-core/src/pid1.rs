//! The PID 1 setup sequence
//!
//! Steps run strictly in order and the first failure aborts the run. Nothing
//! is rolled back: once we exit, the kernel tears the namespaces down anyway.
//!
//! Anything needed after the pivot has to be loaded before it, because the
//! host root is detached at the end of setup.

use crate::config::{ContainerConfig, ContainerTables};
use crate::control::ControlChannel;
use crate::isolation::{devices, mounts, namespace, rootfs, tmpfiles};
use crate::platform::Platform;
use crate::{FurnaceError, Result, reaper};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Pid1State {
    Init,
    VerifyIdentity,
    SessionStart,
    ReapingEnabled,
    NamespacesIsolated,
    RootPivoted,
    MountsApplied,
    DevicesCreated,
    TmpfsPopulated,
    OldRootDetached,
    HostnameSet,
    ReadySignaled,
    AwaitingShutdown,
    Exited,
}

#[derive(Debug)]
pub struct Pid1<'a, P: Platform, R: Read, W: Write> {
    config: ContainerConfig,
    tables: &'a ContainerTables,
    platform: P,
    channel: ControlChannel<R, W>,
    state: Pid1State,
}

impl<'a, P: Platform, R: Read, W: Write> Pid1<'a, P, R, W> {
    pub const fn new(
        config: ContainerConfig,
        tables: &'a ContainerTables,
        platform: P,
        channel: ControlChannel<R, W>,
    ) -> Self {
        Self {
            config,
            tables,
            platform,
            channel,
            state: Pid1State::Init,
        }
    }

    /// Last state reached; after a failed run, the step that did not complete
    /// is the one following it.
    #[must_use]
    pub const fn state(&self) -> Pid1State {
        self.state
    }

    #[must_use]
    pub const fn platform(&self) -> &P {
        &self.platform
    }

    #[must_use]
    pub const fn channel(&self) -> &ControlChannel<R, W> {
        &self.channel
    }

    fn enter(&mut self, state: Pid1State) {
        tracing::debug!(from = ?self.state, to = ?state, "pid1 transition");
        self.state = state;
    }

    /// Set up the container, signal readiness and wait for the controller
    ///
    /// Returns the process exit status, which is always 0 once the control
    /// pipe closes after a successful setup.
    pub fn run(&mut self) -> Result<i32> {
        let pid = self.platform.getpid();
        if pid != 1 {
            return Err(FurnaceError::NotInit { pid });
        }
        self.enter(Pid1State::VerifyIdentity);

        self.platform.setsid()?;
        self.enter(Pid1State::SessionStart);

        reaper::enable(&self.platform)?;
        self.enter(Pid1State::ReapingEnabled);

        namespace::isolate(
            &self.platform,
            &self.tables.namespaces,
            self.config.isolate_networking,
        )?;
        self.enter(Pid1State::NamespacesIsolated);

        rootfs::pivot(&self.platform, &self.config.root_dir)?;
        self.enter(Pid1State::RootPivoted);

        mounts::apply(&self.platform, &self.tables.mounts)?;
        self.enter(Pid1State::MountsApplied);

        devices::create_all(&self.platform, &self.tables.devices)?;
        self.enter(Pid1State::DevicesCreated);

        if tmpfiles::populate(&self.platform, &self.tables.mounts)? {
            self.enter(Pid1State::TmpfsPopulated);
        }

        rootfs::detach_old_root(&self.platform)?;
        self.enter(Pid1State::OldRootDetached);

        self.platform.set_hostname(&self.tables.hostname)?;
        self.enter(Pid1State::HostnameSet);

        self.channel.signal_ready()?;
        self.enter(Pid1State::ReadySignaled);
        tracing::debug!("container started");

        self.enter(Pid1State::AwaitingShutdown);
        self.channel.wait_for_shutdown()?;
        tracing::debug!("control pipe closed, stopping");

        self.enter(Pid1State::Exited);
        Ok(0)
    }
}
