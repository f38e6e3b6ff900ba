//! # furnace-core
//!
//! The init process that runs as PID 1 inside a freshly created container.
//!
//! This crate provides the setup sequence and its building blocks:
//! - Namespace isolation via `unshare` (ipc, mnt, net, uts)
//! - Root filesystem switch with `pivot_root`
//! - The container mount table and `/dev` device nodes
//! - Zombie reaping for orphaned descendants
//! - The readiness/shutdown handshake with the controller

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod control;
pub mod error;
pub mod isolation;
pub mod pid1;
pub mod platform;
pub mod reaper;

pub use config::{ContainerConfig, ContainerTables, StartupArgs};
pub use control::ControlChannel;
pub use error::FurnaceError;
pub use pid1::{Pid1, Pid1State};
pub use platform::{LinuxPlatform, Platform};

/// Crate-level result type
pub type Result<T> = std::result::Result<T, FurnaceError>;
