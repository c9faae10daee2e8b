//! Export and import Proxmox QEMU VMs through an SMB share.
//!
//! Each VM gets its own directory on the share holding vzdump archives and a
//! `manifest.json`. The heavy lifting is done by `vzdump` and `qmrestore`;
//! this crate mounts the share, finds the right archives and reports progress.

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod mount;
pub mod process;
pub mod progress;
pub mod pve;
pub mod vmid;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{MigrateError, Result};

/// Proxmox VM identifier.
pub type VmId = u32;
