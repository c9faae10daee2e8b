use super::Proxmox;
use crate::{process, Result, VmId};
use std::path::Path;
use std::process::Command;

impl Proxmox {
    pub fn qmrestore_command(&self, archive: &Path, target: VmId, storage: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.tools.qmrestore);
        cmd.arg(archive).arg(target.to_string());
        if let Some(storage) = storage {
            cmd.arg("--storage").arg(storage);
        }
        cmd
    }

    /// Restore `archive` as VM `target`, optionally onto another storage.
    pub fn qmrestore(&self, archive: &Path, target: VmId, storage: Option<&str>) -> Result<()> {
        tracing::info!(
            archive = %archive.display(),
            target = target,
            storage = ?storage,
            "Restoring backup"
        );
        process::run(&mut self.qmrestore_command(archive, target, storage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolPaths;
    use crate::test_support::fake_tool;
    use crate::MigrateError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_command_line() {
        let pve = Proxmox::default();
        let archive = Path::new("/mnt/pve/101/vzdump-qemu-101-x.vma.zst");

        let cmd = pve.qmrestore_command(archive, 101, None);
        assert_eq!(
            process::display_command(&cmd),
            "qmrestore /mnt/pve/101/vzdump-qemu-101-x.vma.zst 101"
        );

        let cmd = pve.qmrestore_command(archive, 250, Some("local-lvm"));
        assert_eq!(
            process::display_command(&cmd),
            "qmrestore /mnt/pve/101/vzdump-qemu-101-x.vma.zst 250 --storage local-lvm"
        );
    }

    #[test]
    fn test_restore_runs_tool() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("calls.log");
        let pve = Proxmox::new(ToolPaths {
            qmrestore: fake_tool(
                temp.path(),
                "qmrestore",
                &format!(r#"echo "$@" >> {}"#, log.display()),
            ),
            ..ToolPaths::default()
        });

        pve.qmrestore(Path::new("/backups/a.vma"), 300, Some("tank"))
            .unwrap();
        assert_eq!(
            fs::read_to_string(&log).unwrap().trim(),
            "/backups/a.vma 300 --storage tank"
        );
    }

    #[test]
    fn test_restore_failure() {
        let temp = TempDir::new().unwrap();
        let pve = Proxmox::new(ToolPaths {
            qmrestore: fake_tool(temp.path(), "qmrestore", "echo 'VM 300 already exists' >&2; exit 255"),
            ..ToolPaths::default()
        });

        let err = pve.qmrestore(Path::new("/backups/a.vma"), 300, None).unwrap_err();
        assert!(matches!(err, MigrateError::CommandFailed { code: Some(255), .. }));
    }
}
