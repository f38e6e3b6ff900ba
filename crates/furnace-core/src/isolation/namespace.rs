//! Linux namespace isolation

use crate::Result;
use crate::platform::Platform;
use nix::sched::CloneFlags;

/// One namespace kind: its `/proc/self/ns` entry name and its unshare flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSpec {
    pub name: String,
    pub flag: CloneFlags,
}

impl NamespaceSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, flag: CloneFlags) -> Self {
        Self {
            name: name.into(),
            flag,
        }
    }
}

/// Compute the flags to unshare
///
/// The PID namespace is never requested: the process that spawned us
/// already created it. The network namespace is only requested when
/// `isolate_networking` is set. Kinds the kernel does not expose are
/// skipped with a warning.
pub fn requested_flags<P: Platform + ?Sized>(
    platform: &P,
    namespaces: &[NamespaceSpec],
    isolate_networking: bool,
) -> CloneFlags {
    let mut flags = CloneFlags::empty();

    for ns in namespaces {
        if ns.flag.contains(CloneFlags::CLONE_NEWPID) {
            continue;
        }
        if ns.flag.contains(CloneFlags::CLONE_NEWNET) && !isolate_networking {
            continue;
        }
        if platform.namespace_available(&ns.name) {
            flags |= ns.flag;
        } else {
            tracing::warn!(namespace = %ns.name, "namespace type not supported on this system");
        }
    }

    flags
}

/// Enter the requested namespaces with a single `unshare(2)`
pub fn isolate<P: Platform + ?Sized>(
    platform: &P,
    namespaces: &[NamespaceSpec],
    isolate_networking: bool,
) -> Result<CloneFlags> {
    let flags = requested_flags(platform, namespaces, isolate_networking);
    tracing::debug!(?flags, "unsharing namespaces");
    platform.unshare(flags)?;
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContainerTables;
    use crate::platform::testing::{Call, FakePlatform, Primitive};

    fn table() -> Vec<NamespaceSpec> {
        ContainerTables::standard().namespaces
    }

    #[test]
    fn pid_flag_is_never_requested() {
        let platform = FakePlatform::default();
        for isolate_networking in [true, false] {
            let flags = requested_flags(&platform, &table(), isolate_networking);
            assert!(!flags.contains(CloneFlags::CLONE_NEWPID));
        }
    }

    #[test]
    fn all_supported_kinds_are_requested() {
        let platform = FakePlatform::default();
        let flags = requested_flags(&platform, &table(), true);
        assert_eq!(
            flags,
            CloneFlags::CLONE_NEWIPC
                | CloneFlags::CLONE_NEWNS
                | CloneFlags::CLONE_NEWNET
                | CloneFlags::CLONE_NEWUTS
        );
    }

    #[test]
    fn network_left_shared_unless_requested() {
        let platform = FakePlatform::default();
        let flags = requested_flags(&platform, &table(), false);
        assert!(!flags.contains(CloneFlags::CLONE_NEWNET));
        assert!(flags.contains(CloneFlags::CLONE_NEWNS));
    }

    #[test]
    fn missing_kinds_degrade_instead_of_failing() {
        for spec in table() {
            if spec.flag == CloneFlags::CLONE_NEWPID {
                continue;
            }
            let platform = FakePlatform::default().without_namespace(&spec.name);
            let flags = isolate(&platform, &table(), true).expect("isolation should proceed");
            assert!(!flags.contains(spec.flag), "{} should be skipped", spec.name);
            assert_eq!(platform.calls(), vec![Call::Unshare(flags)]);
        }
    }

    #[test]
    fn unshare_failure_is_fatal() {
        let platform = FakePlatform::default().failing_on(Primitive::Unshare);
        assert!(isolate(&platform, &table(), true).is_err());
    }

    #[test]
    fn fixture_tables_are_honoured() {
        let platform = FakePlatform::default();
        let fixture = vec![NamespaceSpec::new("uts", CloneFlags::CLONE_NEWUTS)];
        let flags = requested_flags(&platform, &fixture, true);
        assert_eq!(flags, CloneFlags::CLONE_NEWUTS);
    }
}
