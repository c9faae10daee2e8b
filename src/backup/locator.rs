use crate::{Result, VmId};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

fn backup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^vzdump-qemu-(\d+)-.*\.(vma|vma\.lzo|vma\.gz|vma\.zst)$")
            .expect("valid backup regex")
    })
}

/// Compression suffix of a vzdump archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Vma,
    VmaLzo,
    VmaGz,
    VmaZst,
}

impl ArchiveKind {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "vma" => Some(ArchiveKind::Vma),
            "vma.lzo" => Some(ArchiveKind::VmaLzo),
            "vma.gz" => Some(ArchiveKind::VmaGz),
            "vma.zst" => Some(ArchiveKind::VmaZst),
            _ => None,
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self {
            ArchiveKind::Vma => "vma",
            ArchiveKind::VmaLzo => "vma.lzo",
            ArchiveKind::VmaGz => "vma.gz",
            ArchiveKind::VmaZst => "vma.zst",
        };
        f.write_str(suffix)
    }
}

/// A vzdump archive found on the share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArchive {
    pub vmid: VmId,
    pub path: PathBuf,
    pub file_name: String,
    pub kind: ArchiveKind,
    pub modified: SystemTime,
}

/// Match a file name against the vzdump naming convention.
pub fn parse_backup_name(name: &str) -> Option<(VmId, ArchiveKind)> {
    let caps = backup_re().captures(name)?;
    let vmid = caps[1].parse().ok()?;
    let kind = ArchiveKind::from_suffix(&caps[2])?;
    Some((vmid, kind))
}

/// All archives directly inside `dir`, in file name order.
///
/// A missing directory has no backups.
pub fn find_backups(dir: &Path) -> Result<Vec<BackupArchive>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    let mut found = Vec::new();
    for path in entries {
        // dangling symlinks are skipped like any other non-file
        let Ok(metadata) = fs::metadata(&path) else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if let Some((vmid, kind)) = parse_backup_name(file_name) {
            found.push(BackupArchive {
                vmid,
                file_name: file_name.to_string(),
                kind,
                modified: metadata.modified()?,
                path,
            });
        }
    }

    tracing::debug!(dir = %dir.display(), count = found.len(), "Scanned backup directory");
    Ok(found)
}

fn newest(candidates: impl Iterator<Item = BackupArchive>) -> Option<BackupArchive> {
    // max_by_key keeps the last maximum, so equal mtimes resolve to name order
    candidates.max_by_key(|archive| archive.modified)
}

/// The most recently modified archive for `vmid` in `dir`.
pub fn newest_backup(dir: &Path, vmid: VmId) -> Result<Option<BackupArchive>> {
    Ok(newest(
        find_backups(dir)?.into_iter().filter(|a| a.vmid == vmid),
    ))
}

/// Names of the archives for `vmid` currently in `dir`.
pub fn snapshot_names(dir: &Path, vmid: VmId) -> Result<BTreeSet<String>> {
    Ok(find_backups(dir)?
        .into_iter()
        .filter(|a| a.vmid == vmid)
        .map(|a| a.file_name)
        .collect())
}

/// Find the archive an export just produced.
///
/// Prefers archives absent from `before`; if there are none (the export
/// overwrote an existing name) falls back to the newest archive.
pub fn identify_new_backup(
    dir: &Path,
    vmid: VmId,
    before: &BTreeSet<String>,
) -> Result<Option<BackupArchive>> {
    let archives: Vec<BackupArchive> = find_backups(dir)?
        .into_iter()
        .filter(|a| a.vmid == vmid)
        .collect();

    let fresh = newest(
        archives
            .iter()
            .filter(|a| !before.contains(&a.file_name))
            .cloned(),
    );

    match fresh {
        Some(archive) => Ok(Some(archive)),
        None => {
            tracing::debug!(vmid = vmid, "No new archive name, using newest by mtime");
            Ok(newest(archives.into_iter()))
        }
    }
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod locator_tests;
