use super::Proxmox;
use crate::{process, vmid, Result, VmId};
use std::process::Command;

impl Proxmox {
    /// All QEMU VM ids on this node, from `qm list`.
    pub fn list_vmids(&self) -> Result<Vec<VmId>> {
        let stdout = process::run_checked_capture(Command::new(&self.tools.qm).arg("list"))?;
        let vmids = vmid::parse_qm_list(&stdout);
        tracing::debug!(count = vmids.len(), "Listed QEMU VMs");
        Ok(vmids)
    }

    /// Ask the cluster for an unused id, falling back to a local scan.
    pub fn next_free_vmid(&self) -> Result<VmId> {
        match self.query_cluster_nextid() {
            Some(vmid) => Ok(vmid),
            None => {
                let used = self.list_vmids()?;
                let vmid = vmid::lowest_free_vmid(&used);
                tracing::info!(vmid = vmid, "Picked free VMID from qm list");
                Ok(vmid)
            }
        }
    }

    fn query_cluster_nextid(&self) -> Option<VmId> {
        let output = match process::run_capture(
            Command::new(&self.tools.pvesh).args(["get", "/cluster/nextid"]),
        ) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "pvesh unavailable, scanning VM list instead");
                return None;
            }
        };

        if !output.status.success() {
            tracing::warn!(
                code = ?output.status.code(),
                "pvesh get /cluster/nextid failed, scanning VM list instead"
            );
            return None;
        }

        parse_nextid(&String::from_utf8_lossy(&output.stdout))
    }
}

/// `pvesh get /cluster/nextid` prints a bare number (sometimes quoted JSON).
fn parse_nextid(stdout: &str) -> Option<VmId> {
    let s = stdout.trim().trim_matches('"');
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
