use std::path::PathBuf;
use thiserror::Error;

use crate::VmId;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Invalid VMID: {0}")]
    InvalidVmid(String),

    #[error("No valid VMIDs provided")]
    NoVmidsProvided,

    #[error("No QEMU VMs found (qm list returned none).")]
    NoVmsFound,

    #[error("Missing required setting: --{0} (pass it on the command line or in the config file)")]
    MissingSetting(&'static str),

    #[error("run as root (needed for mount + Proxmox commands).")]
    NotRoot,

    #[error("Failed to run {program}: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}", describe_code(.code))]
    CommandFailed { program: String, code: Option<i32> },

    #[error("vzdump failed for VM {vmid} (exit {})", describe_code(.code))]
    ExportFailed {
        vmid: VmId,
        code: Option<i32>,
        tail: Vec<String>,
    },

    #[error("No backup found for VMID {vmid} in {}", .dir.display())]
    BackupNotFound { vmid: VmId, dir: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Interrupted by signal {0}")]
    Interrupted(i32),
}

impl MigrateError {
    /// Bad input (ids, settings, config file) exits with 2, a signal with
    /// 128 + its number, everything else with 1.
    pub fn exit_code(&self) -> i32 {
        if let MigrateError::Interrupted(signal) = self {
            128 + signal
        } else if self.is_validation() {
            2
        } else {
            1
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MigrateError::InvalidVmid(_)
                | MigrateError::NoVmidsProvided
                | MigrateError::NoVmsFound
                | MigrateError::MissingSetting(_)
                | MigrateError::Config(_)
        )
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_exit_with_two() {
        assert_eq!(MigrateError::InvalidVmid("abc".into()).exit_code(), 2);
        assert_eq!(MigrateError::NoVmidsProvided.exit_code(), 2);
        assert_eq!(MigrateError::NoVmsFound.exit_code(), 2);
        assert_eq!(MigrateError::MissingSetting("share").exit_code(), 2);
        assert_eq!(MigrateError::Config("bad".into()).exit_code(), 2);
    }

    #[test]
    fn test_operational_errors_exit_with_one() {
        assert_eq!(MigrateError::NotRoot.exit_code(), 1);
        let err = MigrateError::CommandFailed {
            program: "qmrestore".into(),
            code: Some(255),
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "qmrestore exited with code 255");
    }

    #[test]
    fn test_interrupted_exits_with_signal_code() {
        assert_eq!(MigrateError::Interrupted(2).exit_code(), 130);
        assert_eq!(MigrateError::Interrupted(15).exit_code(), 143);
        assert_eq!(
            MigrateError::Interrupted(2).to_string(),
            "Interrupted by signal 2"
        );
    }

    #[test]
    fn test_export_failed_message() {
        let err = MigrateError::ExportFailed {
            vmid: 101,
            code: Some(2),
            tail: vec!["ERROR: boom".into()],
        };
        assert_eq!(err.to_string(), "vzdump failed for VM 101 (exit code 2)");
    }
}
