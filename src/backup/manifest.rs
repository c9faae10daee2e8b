use crate::{Result, VmId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Metadata written next to each exported archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub vmid: VmId,
    pub created_epoch: i64,
    pub created_utc: String,
    pub node: String,
    pub backup_file: String,
    pub size_bytes: u64,
    pub backup_mtime_epoch: i64,
}

impl Manifest {
    /// Describe `backup_file` as it is on disk right now.
    pub fn for_backup(vmid: VmId, backup_file: &Path, node: &str) -> Result<Self> {
        Self::for_backup_at(vmid, backup_file, node, Utc::now())
    }

    pub fn for_backup_at(
        vmid: VmId,
        backup_file: &Path,
        node: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let metadata = fs::metadata(backup_file)?;
        let mtime = metadata.modified()?;
        let backup_mtime_epoch = match mtime.duration_since(UNIX_EPOCH) {
            Ok(since) => since.as_secs() as i64,
            Err(before) => -(before.duration().as_secs() as i64),
        };

        Ok(Self {
            vmid,
            created_epoch: now.timestamp(),
            created_utc: now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            node: node.to_string(),
            backup_file: backup_file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size_bytes: metadata.len(),
            backup_mtime_epoch,
        })
    }

    pub fn path_in(vm_dir: &Path) -> PathBuf {
        vm_dir.join(MANIFEST_FILE)
    }

    /// Write `manifest.json` into `vm_dir`, replacing any previous one.
    pub fn write(&self, vm_dir: &Path) -> Result<PathBuf> {
        let path = Self::path_in(vm_dir);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;

        tracing::info!(
            vmid = self.vmid,
            path = %path.display(),
            "Manifest written"
        );

        Ok(path)
    }

    /// Read the manifest in `vm_dir`, if there is one.
    pub fn load(vm_dir: &Path) -> Result<Option<Self>> {
        let path = Self::path_in(vm_dir);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

/// Host name recorded in manifests.
pub fn node_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
