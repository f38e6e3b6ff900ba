//! furnace-pid1 - init process for furnace containers
//!
//! Started by the controller inside a fresh PID namespace with a single
//! JSON argument. Sets up the container root, writes the ready marker to
//! the control pipe, and exits once the controller closes it.

use clap::Parser;
use furnace_core::{
    ContainerTables, ControlChannel, LinuxPlatform, Pid1, StartupArgs,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "furnace-pid1")]
#[command(author, version, about = "PID 1 for furnace containers")]
struct Cli {
    /// Startup arguments as JSON: root_dir, control_read, control_write,
    /// loglevel, isolate_networking
    args: String,
}

fn init_logging(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.parse()?)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run(args: &StartupArgs) -> furnace_core::Result<i32> {
    let config = args.container_config()?;
    tracing::info!(
        root = %config.root_dir.display(),
        isolate_networking = config.isolate_networking,
        "starting container init"
    );

    // SAFETY: the controller hands these descriptors to us and nothing else in
    // this process owns them.
    #[allow(unsafe_code)]
    let channel = unsafe { ControlChannel::from_raw_fds(args.control_read, args.control_write) }?;

    let tables = ContainerTables::standard();
    let mut pid1 = Pid1::new(config, &tables, LinuxPlatform::new(), channel);
    pid1.run().inspect_err(|e| {
        tracing::error!(state = ?pid1.state(), "container init failed: {e}");
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let args = match StartupArgs::from_json(&cli.args) {
        Ok(args) => args,
        Err(e) => {
            // logging is not configured yet
            eprintln!("furnace-pid1: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(args.loglevel.as_directive()) {
        eprintln!("furnace-pid1: failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(status) => ExitCode::from(u8::try_from(status).unwrap_or(1)),
        Err(_) => ExitCode::FAILURE,
    }
}
