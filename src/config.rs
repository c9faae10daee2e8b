//! Optional TOML defaults for the command line.
//!
//! Command-line flags always win over values from the file. The SMB password
//! is never read from here.

use crate::{MigrateError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MOUNTPOINT: &str = "/mnt/pve_smb_migrate";
pub const DEFAULT_SMB_VERS: &str = "3.0";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub smb: SmbConfig,
    pub export: ExportConfig,
    pub import: ImportConfig,
    pub tools: ToolPaths,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SmbConfig {
    pub share: Option<String>,
    pub username: Option<String>,
    pub domain: Option<String>,
    pub vers: Option<String>,
    pub mountpoint: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub compress: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub storage: Option<String>,
}

/// Programs this tool shells out to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub qm: String,
    pub vzdump: String,
    pub qmrestore: String,
    pub pvesh: String,
    pub mount: String,
    pub umount: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            qm: "qm".to_string(),
            vzdump: "vzdump".to_string(),
            qmrestore: "qmrestore".to_string(),
            pvesh: "pvesh".to_string(),
            mount: "mount".to_string(),
            umount: "umount".to_string(),
        }
    }
}

impl FileConfig {
    /// Default location: `$XDG_CONFIG_HOME/pve-migrate/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pve-migrate").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MigrateError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| MigrateError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// An explicit path must exist; the default path is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "Loading config file");
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FileConfig::from_toml("").unwrap();
        assert!(config.smb.share.is_none());
        assert_eq!(config.tools.vzdump, "vzdump");
        assert_eq!(config.tools.umount, "umount");
    }

    #[test]
    fn test_partial_config() {
        let config = FileConfig::from_toml(
            r#"
            [smb]
            share = "//nas/backups"
            username = "backup"

            [export]
            mode = "snapshot"

            [tools]
            vzdump = "/usr/local/bin/vzdump"
            "#,
        )
        .unwrap();

        assert_eq!(config.smb.share.as_deref(), Some("//nas/backups"));
        assert_eq!(config.smb.username.as_deref(), Some("backup"));
        assert!(config.smb.domain.is_none());
        assert_eq!(config.export.mode.as_deref(), Some("snapshot"));
        assert!(config.export.compress.is_none());
        assert_eq!(config.tools.vzdump, "/usr/local/bin/vzdump");
        assert_eq!(config.tools.qm, "qm");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(FileConfig::from_toml("[smb]\nshare = 5\n").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        let result = FileConfig::load(Some(&temp.path().join("nope.toml")));
        assert!(matches!(result, Err(MigrateError::Config(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[import]\nstorage = \"local-lvm\"\n").unwrap();

        let config = FileConfig::load(Some(&path)).unwrap();
        assert_eq!(config.import.storage.as_deref(), Some("local-lvm"));
    }
}
