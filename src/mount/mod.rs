// SMB share mounting
pub mod credentials;

pub use credentials::{CredentialsFile, SmbCredentials};

use crate::{config::ToolPaths, process, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const PROC_MOUNTS: &str = "/proc/self/mounts";

/// `/proc/mounts` escapes space, tab, newline and backslash as octal.
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let octal = &bytes[i + 1..i + 4];
            if octal.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let value = octal.iter().fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Whether `mountpoint` is the target of an entry in `mount_table`.
pub fn is_mounted_in(mount_table: &Path, mountpoint: &Path) -> Result<bool> {
    let target = mountpoint
        .canonicalize()
        .unwrap_or_else(|_| mountpoint.to_path_buf());

    let contents = fs::read_to_string(mount_table)?;
    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        if let (Some(_device), Some(mounted_on)) = (fields.next(), fields.next()) {
            if Path::new(&unescape_mount_field(mounted_on)) == target {
                return Ok(true);
            }
        }
    }

    Ok(false)
}

/// Mounts one SMB share at a fixed mountpoint.
pub struct MountManager {
    mountpoint: PathBuf,
    vers: String,
    mount_table: PathBuf,
    credentials_dir: PathBuf,
    mount_bin: String,
    umount_bin: String,
}

impl MountManager {
    pub fn new(mountpoint: PathBuf, vers: impl Into<String>, tools: &ToolPaths) -> Self {
        Self {
            mountpoint,
            vers: vers.into(),
            mount_table: PathBuf::from(PROC_MOUNTS),
            credentials_dir: CredentialsFile::default_dir(),
            mount_bin: tools.mount.clone(),
            umount_bin: tools.umount.clone(),
        }
    }

    /// Read mounts from somewhere other than `/proc/self/mounts`.
    pub fn with_mount_table(mut self, mount_table: PathBuf) -> Self {
        self.mount_table = mount_table;
        self
    }

    pub fn with_credentials_dir(mut self, dir: PathBuf) -> Self {
        self.credentials_dir = dir;
        self
    }

    pub fn mountpoint(&self) -> &Path {
        &self.mountpoint
    }

    pub fn is_mounted(&self) -> Result<bool> {
        is_mounted_in(&self.mount_table, &self.mountpoint)
    }

    /// Option string handed to `mount -o`.
    pub fn mount_options(&self, credentials_file: &Path) -> String {
        [
            format!("credentials={}", credentials_file.display()),
            format!("vers={}", self.vers),
            "rw".to_string(),
            "uid=0".to_string(),
            "gid=0".to_string(),
            "file_mode=0770".to_string(),
            "dir_mode=0770".to_string(),
            "nounix".to_string(),
            "serverino".to_string(),
        ]
        .join(",")
    }

    /// Mount `share` unless something is already mounted at the mountpoint.
    ///
    /// The returned guard unmounts on drop only when this call did the
    /// mounting.
    pub fn ensure_mounted(
        &self,
        share: &str,
        credentials: &SmbCredentials,
    ) -> Result<MountGuard<'_>> {
        if self.is_mounted()? {
            tracing::info!(
                mountpoint = %self.mountpoint.display(),
                "Already mounted, leaving it in place"
            );
            return Ok(MountGuard {
                manager: self,
                owned: false,
            });
        }

        fs::create_dir_all(&self.mountpoint)?;

        tracing::info!(
            share = %share,
            mountpoint = %self.mountpoint.display(),
            vers = %self.vers,
            "Mounting SMB share"
        );

        let creds_file = CredentialsFile::create_in(&self.credentials_dir, credentials)?;
        let result = process::run(
            Command::new(&self.mount_bin)
                .arg("-t")
                .arg("cifs")
                .arg(share)
                .arg(&self.mountpoint)
                .arg("-o")
                .arg(self.mount_options(creds_file.path())),
        );

        if let Err(e) = creds_file.remove() {
            tracing::warn!(error = %e, "Failed to remove credentials file");
        }
        result?;

        Ok(MountGuard {
            manager: self,
            owned: true,
        })
    }

    /// Best-effort `umount -f`; failures are only logged.
    pub fn release(&self) {
        tracing::info!(mountpoint = %self.mountpoint.display(), "Unmounting SMB share");

        let result = process::run(Command::new(&self.umount_bin).arg("-f").arg(&self.mountpoint));
        if let Err(e) = result {
            tracing::warn!(
                mountpoint = %self.mountpoint.display(),
                error = %e,
                "Unmount failed"
            );
        }
    }
}

/// Keeps the share mounted for the duration of a run.
pub struct MountGuard<'a> {
    manager: &'a MountManager,
    owned: bool,
}

impl MountGuard<'_> {
    /// True when this run created the mount.
    pub fn owned(&self) -> bool {
        self.owned
    }

    pub fn path(&self) -> &Path {
        self.manager.mountpoint()
    }

    /// Unmount now instead of waiting for drop.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.owned {
            return;
        }
        self.owned = false;

        match self.manager.is_mounted() {
            Ok(true) => self.manager.release(),
            Ok(false) => {
                tracing::debug!("Mount already gone, nothing to release");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not read mount table, unmounting anyway");
                self.manager.release();
            }
        }
    }
}

impl Drop for MountGuard<'_> {
    fn drop(&mut self) {
        self.release_inner();
    }
}
