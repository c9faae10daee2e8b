// CLI module - argument handling and the export/import batch loops
pub mod args;
pub mod export;
pub mod import;
pub mod prompt;
pub mod summary;

pub use args::{Action, Args, Settings};

use crate::mount::{MountManager, SmbCredentials};
use crate::pve::{Proxmox, VzdumpOptions};
use crate::{interrupt, MigrateError, VmId};
use anyhow::Result;
use export::ExportOptions;
use import::ImportOptions;
use std::io::IsTerminal;
use summary::{BatchSummary, Outcome};

/// What happened to one VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub vmid: VmId,
    pub archive: String,
    pub target: VmId,
}

impl ActionReport {
    fn describe(&self) -> String {
        if self.vmid == self.target {
            self.archive.clone()
        } else {
            format!("{} -> VMID {}", self.archive, self.target)
        }
    }
}

/// Mount the share and run the selected action against it.
///
/// The mount guard lives for the whole action, so the share is released on
/// success, on error and after a SIGINT/SIGTERM alike.
pub fn run(
    settings: &Settings,
    vmids: &[VmId],
    pve: &Proxmox,
    mounts: &MountManager,
) -> Result<()> {
    let credentials = SmbCredentials {
        username: settings.username.clone(),
        password: settings.password.clone().unwrap_or_default(),
        domain: settings.domain.clone(),
    };

    let guard = mounts.ensure_mounted(&settings.share, &credentials)?;
    let root = guard.path();

    match settings.action {
        Action::Export => {
            let opts = ExportOptions {
                vzdump: VzdumpOptions {
                    compress: settings.compress,
                    mode: settings.mode,
                    verbose: settings.verbose,
                    show_progress: std::io::stderr().is_terminal(),
                },
                continue_on_error: settings.continue_on_error,
            };
            export::execute(vmids, root, &opts, pve)
        }
        Action::Import => {
            let opts = ImportOptions {
                storage: settings.storage.clone(),
                new_vmid: settings.new_vmid,
                continue_on_error: settings.continue_on_error,
            };
            import::execute(vmids, root, &opts, pve)
        }
    }
}

/// Run `step` for each VM in order.
///
/// Without `continue_on_error` the first failure ends the batch. With it,
/// every VM is attempted, a summary is printed and the batch fails if any
/// VM did. A SIGINT/SIGTERM ends the batch in either mode.
pub fn run_batch<F>(
    action: &str,
    vmids: &[VmId],
    continue_on_error: bool,
    mut step: F,
) -> Result<Vec<ActionReport>>
where
    F: FnMut(VmId) -> crate::Result<ActionReport>,
{
    let mut reports = Vec::with_capacity(vmids.len());

    if !continue_on_error {
        for &vmid in vmids {
            interrupt::check()?;
            reports.push(step(vmid)?);
        }
        return Ok(reports);
    }

    let mut summary = BatchSummary::new();
    for &vmid in vmids {
        interrupt::check()?;
        match step(vmid) {
            Ok(report) => {
                summary.record(vmid, Outcome::Done(report.describe()));
                reports.push(report);
            }
            Err(e @ MigrateError::Interrupted(_)) => {
                summary.record(vmid, Outcome::Failed(e.to_string()));
                summary.print();
                return Err(e.into());
            }
            Err(e) => {
                tracing::error!(vmid = vmid, error = %e, "{} failed, continuing", action);
                summary.record(vmid, Outcome::Failed(e.to_string()));
            }
        }
    }

    summary.print();

    let failures = summary.failures();
    if failures > 0 {
        anyhow::bail!("{} failed for {} of {} VMs", action, failures, summary.len());
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(vmid: VmId) -> ActionReport {
        ActionReport {
            vmid,
            archive: format!("vzdump-qemu-{}-a.vma", vmid),
            target: vmid,
        }
    }

    fn fail_on_102(vmid: VmId) -> crate::Result<ActionReport> {
        if vmid == 102 {
            Err(MigrateError::BackupNotFound {
                vmid,
                dir: "/mnt/102".into(),
            })
        } else {
            Ok(report(vmid))
        }
    }

    #[test]
    fn test_fail_fast_stops_at_first_error() {
        let mut seen = Vec::new();
        let err = run_batch("Import", &[101, 102, 103], false, |vmid| {
            seen.push(vmid);
            fail_on_102(vmid)
        })
        .unwrap_err();

        assert_eq!(seen, vec![101, 102]);
        assert!(matches!(
            err.downcast_ref::<MigrateError>(),
            Some(MigrateError::BackupNotFound { vmid: 102, .. })
        ));
    }

    #[test]
    fn test_continue_on_error_attempts_every_vm() {
        let mut seen = Vec::new();
        let err = run_batch("Import", &[101, 102, 103], true, |vmid| {
            seen.push(vmid);
            fail_on_102(vmid)
        })
        .unwrap_err();

        assert_eq!(seen, vec![101, 102, 103]);
        assert_eq!(err.to_string(), "Import failed for 1 of 3 VMs");
    }

    #[test]
    fn test_interrupt_ends_continue_on_error_batch() {
        let mut seen = Vec::new();
        let err = run_batch("Export", &[101, 102, 103], true, |vmid| {
            seen.push(vmid);
            if vmid == 102 {
                Err(MigrateError::Interrupted(2))
            } else {
                Ok(report(vmid))
            }
        })
        .unwrap_err();

        assert_eq!(seen, vec![101, 102]);
        assert!(matches!(
            err.downcast_ref::<MigrateError>(),
            Some(MigrateError::Interrupted(2))
        ));
    }

    #[test]
    fn test_all_succeed() {
        let reports = run_batch("Export", &[101, 103], true, |vmid| Ok(report(vmid))).unwrap();
        assert_eq!(reports, vec![report(101), report(103)]);
    }

    #[test]
    fn test_describe_mentions_new_target() {
        let mut r = report(101);
        assert_eq!(r.describe(), "vzdump-qemu-101-a.vma");
        r.target = 250;
        assert_eq!(r.describe(), "vzdump-qemu-101-a.vma -> VMID 250");
    }
}
