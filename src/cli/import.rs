use super::{run_batch, ActionReport};
use crate::backup::{self, Manifest};
use crate::pve::Proxmox;
use crate::{MigrateError, VmId};
use anyhow::Result;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Restore disks onto this storage instead of the original one
    pub storage: Option<String>,
    /// Ask the cluster for a free VMID instead of reusing the original
    pub new_vmid: bool,
    pub continue_on_error: bool,
}

pub fn execute(vmids: &[VmId], root: &Path, opts: &ImportOptions, pve: &Proxmox) -> Result<()> {
    tracing::info!(count = vmids.len(), root = %root.display(), "Importing VMs");

    run_batch("Import", vmids, opts.continue_on_error, |vmid| {
        import_one(vmid, root, opts, pve)
    })?;

    println!("Import complete.");
    Ok(())
}

/// Restore the newest archive in `<root>/<vmid>/`.
pub fn import_one(
    vmid: VmId,
    root: &Path,
    opts: &ImportOptions,
    pve: &Proxmox,
) -> crate::Result<ActionReport> {
    let vm_dir = backup::vm_dir(root, vmid);
    let archive = backup::newest_backup(&vm_dir, vmid)?.ok_or_else(|| {
        MigrateError::BackupNotFound {
            vmid,
            dir: vm_dir.clone(),
        }
    })?;

    // informational only; a missing or broken manifest never blocks a restore
    match Manifest::load(&vm_dir) {
        Ok(Some(manifest)) if manifest.backup_file == archive.file_name => {
            println!(
                "  Backup taken on {} at {}",
                manifest.node, manifest.created_utc
            );
        }
        Ok(Some(manifest)) => {
            tracing::debug!(
                vmid = vmid,
                manifest_file = %manifest.backup_file,
                "Manifest describes a different archive"
            );
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(vmid = vmid, error = %e, "Ignoring unreadable manifest");
        }
    }

    let target = if opts.new_vmid {
        pve.next_free_vmid()?
    } else {
        vmid
    };

    println!("Restoring {} -> VMID {}", archive.file_name, target);
    pve.qmrestore(&archive.path, target, opts.storage.as_deref())?;

    Ok(ActionReport {
        vmid,
        archive: archive.file_name,
        target,
    })
}
