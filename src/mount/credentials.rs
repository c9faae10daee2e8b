use crate::Result;
use std::fs::Permissions;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// SMB login passed to `mount.cifs`.
#[derive(Clone)]
pub struct SmbCredentials {
    pub username: String,
    pub password: String,
    pub domain: Option<String>,
}

impl std::fmt::Debug for SmbCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmbCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}

impl SmbCredentials {
    /// `mount.cifs` credentials file format.
    pub fn render(&self) -> String {
        let mut out = format!("username={}\npassword={}\n", self.username, self.password);
        if let Some(domain) = &self.domain {
            out.push_str(&format!("domain={}\n", domain));
        }
        out
    }
}

/// A `0600` credentials file that is removed when dropped.
pub struct CredentialsFile {
    file: NamedTempFile,
}

impl CredentialsFile {
    /// `/run` when present (tmpfs), otherwise the system temp dir.
    pub fn default_dir() -> PathBuf {
        let run = Path::new("/run");
        if run.is_dir() {
            run.to_path_buf()
        } else {
            std::env::temp_dir()
        }
    }

    pub fn create_in(dir: &Path, credentials: &SmbCredentials) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("pve_smb_creds_")
            .tempfile_in(dir)?;

        file.as_file()
            .set_permissions(Permissions::from_mode(0o600))?;
        file.write_all(credentials.render().as_bytes())?;
        file.flush()?;

        tracing::debug!(path = %file.path().display(), "Wrote transient credentials file");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Remove the file now, reporting failures instead of ignoring them.
    pub fn remove(self) -> Result<()> {
        self.file.close()?;
        Ok(())
    }
}
