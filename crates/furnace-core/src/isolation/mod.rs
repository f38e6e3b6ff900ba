//! Container isolation steps
//!
//! Each module is one step of the PID 1 setup sequence:
//! - `namespace` - unshare the requested namespaces
//! - `rootfs` - pivot into the container root and drop the host root
//! - `mounts` - the fixed mount table
//! - `devices` - device nodes under `/dev`
//! - `tmpfiles` - optional tmpfs population

pub mod devices;
pub mod mounts;
pub mod namespace;
pub mod rootfs;
pub mod tmpfiles;

pub use self::devices::{DeviceKind, DeviceNodeSpec};
pub use self::mounts::MountSpec;
pub use self::namespace::NamespaceSpec;
