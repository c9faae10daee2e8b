// Backup archives and manifests on the share
pub mod locator;
pub mod manifest;

pub use locator::{
    find_backups, identify_new_backup, newest_backup, snapshot_names, ArchiveKind,
    BackupArchive,
};
pub use manifest::{node_name, Manifest};

use crate::VmId;
use std::path::{Path, PathBuf};

/// One directory per VM id under the mountpoint.
pub fn vm_dir(root: &Path, vmid: VmId) -> PathBuf {
    root.join(vmid.to_string())
}
