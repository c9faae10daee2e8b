use super::{run_batch, ActionReport};
use crate::backup::{self, Manifest};
use crate::pve::{Proxmox, VzdumpOptions};
use crate::{MigrateError, VmId};
use anyhow::Result;
use byte_unit::{Byte, UnitType};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub vzdump: VzdumpOptions,
    pub continue_on_error: bool,
}

pub fn execute(vmids: &[VmId], root: &Path, opts: &ExportOptions, pve: &Proxmox) -> Result<()> {
    tracing::info!(count = vmids.len(), root = %root.display(), "Exporting VMs");

    let node = backup::node_name();
    run_batch("Export", vmids, opts.continue_on_error, |vmid| {
        export_one(vmid, root, &opts.vzdump, pve, &node)
    })?;

    println!("Export complete.");
    Ok(())
}

/// vzdump one VM into `<root>/<vmid>/` and write its manifest.
pub fn export_one(
    vmid: VmId,
    root: &Path,
    opts: &VzdumpOptions,
    pve: &Proxmox,
    node: &str,
) -> crate::Result<ActionReport> {
    let vm_dir = backup::vm_dir(root, vmid);
    fs::create_dir_all(&vm_dir)?;

    let before = backup::snapshot_names(&vm_dir, vmid)?;

    pve.vzdump(vmid, &vm_dir, opts)?;

    let archive = backup::identify_new_backup(&vm_dir, vmid, &before)?.ok_or_else(|| {
        MigrateError::BackupNotFound {
            vmid,
            dir: vm_dir.clone(),
        }
    })?;

    let manifest = Manifest::for_backup(vmid, &archive.path, node)?;
    let manifest_path = manifest.write(&vm_dir)?;
    println!("Manifest written: {}", manifest_path.display());

    let size = Byte::from_u64(manifest.size_bytes).get_appropriate_unit(UnitType::Binary);
    println!("Exported VM {} -> {} ({:.2})", vmid, archive.file_name, size);

    Ok(ActionReport {
        vmid,
        archive: archive.file_name,
        target: vmid,
    })
}
