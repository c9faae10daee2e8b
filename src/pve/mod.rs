// Proxmox command wrappers
pub mod qm;
pub mod qmrestore;
pub mod vzdump;

pub use vzdump::{BackupMode, Compression, VzdumpOptions};

use crate::config::ToolPaths;

/// Runs the Proxmox CLI tools named in [`ToolPaths`].
#[derive(Debug, Clone, Default)]
pub struct Proxmox {
    tools: ToolPaths,
}

impl Proxmox {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }
}
