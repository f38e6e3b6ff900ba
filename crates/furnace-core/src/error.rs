//! Error types for furnace-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FurnaceError {
    #[error("not running as PID 1 of the namespace (pid {pid}), refusing to continue")]
    NotInit { pid: i32 },

    #[error("session error: {0}")]
    Session(String),

    #[error("signal error: {0}")]
    Signal(String),

    #[error("namespace error: {0}")]
    Namespace(String),

    #[error("mount error: {0}")]
    Mount(String),

    #[error("pivot_root error: {0}")]
    Pivot(String),

    #[error("device node error: {0}")]
    Device(String),

    #[error("tmpfiles error: {0}")]
    Tmpfiles(String),

    #[error("hostname error: {0}")]
    Hostname(String),

    #[error("control channel error: {0}")]
    Control(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("nix error: {0}")]
    Nix(#[from] nix::Error),

    #[error("invalid startup arguments: {0}")]
    Json(#[from] serde_json::Error),
}
