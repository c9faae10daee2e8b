use crate::config::{FileConfig, ToolPaths, DEFAULT_MOUNTPOINT, DEFAULT_SMB_VERS};
use crate::pve::{BackupMode, Compression};
use crate::{MigrateError, Result};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pve-migrate", version)]
#[command(about = "Export/import Proxmox QEMU VMs via SMB (one folder per VMID).", long_about = None)]
#[command(group(ArgGroup::new("action").required(true).args(["export", "import"])))]
pub struct Args {
    /// Export VMs to SMB (vzdump)
    #[arg(long)]
    pub export: bool,

    /// Import VMs from SMB (qmrestore)
    #[arg(long)]
    pub import: bool,

    /// Comma-separated VMIDs (e.g. 101,102) or 'all'
    #[arg(long)]
    pub vmids: String,

    /// SMB share, e.g. //server/share
    #[arg(long)]
    pub share: Option<String>,

    /// Local mountpoint [default: /mnt/pve_smb_migrate]
    #[arg(long)]
    pub mountpoint: Option<PathBuf>,

    /// SMB username
    #[arg(long)]
    pub username: Option<String>,

    /// SMB password (omit to be prompted)
    #[arg(long, env = "PVE_MIGRATE_SMB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// SMB domain
    #[arg(long)]
    pub domain: Option<String>,

    /// SMB protocol version [default: 3.0]
    #[arg(long)]
    pub vers: Option<String>,

    /// vzdump compression [default: zstd]
    #[arg(long, value_enum)]
    pub compress: Option<Compression>,

    /// vzdump mode [default: stop]
    #[arg(long, value_enum)]
    pub mode: Option<BackupMode>,

    /// Target Proxmox storage for restored disks (qmrestore --storage)
    #[arg(long)]
    pub storage: Option<String>,

    /// Allocate new VMIDs on import to avoid conflicts
    #[arg(long)]
    pub new_vmid: bool,

    /// Print vzdump output lines and debug logs
    #[arg(short, long)]
    pub verbose: bool,

    /// Keep going after a VM fails and print a summary at the end
    #[arg(long)]
    pub continue_on_error: bool,

    /// Config file with defaults [default: ~/.config/pve-migrate/config.toml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Export,
    Import,
}

/// Command line merged with the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub action: Action,
    pub vmids: String,
    pub share: String,
    pub mountpoint: PathBuf,
    pub username: String,
    pub password: Option<String>,
    pub domain: Option<String>,
    pub vers: String,
    pub compress: Compression,
    pub mode: BackupMode,
    pub storage: Option<String>,
    pub new_vmid: bool,
    pub verbose: bool,
    pub continue_on_error: bool,
    pub tools: ToolPaths,
}

impl Args {
    /// Flags win over the config file, which wins over built-in defaults.
    pub fn into_settings(self, file: FileConfig) -> Result<Settings> {
        let action = if self.export {
            Action::Export
        } else {
            Action::Import
        };

        let share = self
            .share
            .or(file.smb.share)
            .ok_or(MigrateError::MissingSetting("share"))?;
        let username = self
            .username
            .or(file.smb.username)
            .ok_or(MigrateError::MissingSetting("username"))?;

        let compress = match self.compress {
            Some(compress) => compress,
            None => parse_file_enum("export.compress", file.export.compress.as_deref())?
                .unwrap_or_default(),
        };
        let mode = match self.mode {
            Some(mode) => mode,
            None => parse_file_enum("export.mode", file.export.mode.as_deref())?
                .unwrap_or_default(),
        };

        Ok(Settings {
            action,
            vmids: self.vmids,
            share,
            mountpoint: self
                .mountpoint
                .or(file.smb.mountpoint)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MOUNTPOINT)),
            username,
            password: self.password.filter(|p| !p.is_empty()),
            domain: self.domain.or(file.smb.domain),
            vers: self
                .vers
                .or(file.smb.vers)
                .unwrap_or_else(|| DEFAULT_SMB_VERS.to_string()),
            compress,
            mode,
            storage: self.storage.or(file.import.storage),
            new_vmid: self.new_vmid,
            verbose: self.verbose,
            continue_on_error: self.continue_on_error,
            tools: file.tools,
        })
    }
}

fn parse_file_enum<T: clap::ValueEnum>(key: &str, value: Option<&str>) -> Result<Option<T>> {
    value
        .map(|v| {
            T::from_str(v, false)
                .map_err(|_| MigrateError::Config(format!("invalid value '{}' for {}", v, key)))
        })
        .transpose()
}
