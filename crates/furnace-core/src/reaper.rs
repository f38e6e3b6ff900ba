//! Zombie reaping for PID 1
//!
//! Orphans are re-parented to us. With SIGCHLD explicitly set to SIG_IGN the
//! kernel discards them on exit instead of keeping zombies around, and we
//! never have to call `waitpid`. The default disposition is also "ignore" but
//! does not have this effect.

use crate::Result;
use crate::platform::Platform;

/// Must run before any child can be created or inherited
pub fn enable<P: Platform + ?Sized>(platform: &P) -> Result<()> {
    platform.ignore_child_signal()?;
    tracing::debug!("zombie reaping enabled");
    Ok(())
}
