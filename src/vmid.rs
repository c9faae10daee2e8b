//! Turns a `--vmids` selector into a concrete, sorted list of VM ids.

use crate::{MigrateError, Result, VmId};
use std::collections::BTreeSet;

/// Resolve `all` or a comma separated list into sorted, distinct ids.
///
/// `list_vms` is only called for `all`, so a literal list never touches the
/// hypervisor.
pub fn parse_vmid_selector<F>(selector: &str, list_vms: F) -> Result<Vec<VmId>>
where
    F: FnOnce() -> Result<Vec<VmId>>,
{
    if selector.trim().eq_ignore_ascii_case("all") {
        let mut vmids = list_vms()?;
        if vmids.is_empty() {
            return Err(MigrateError::NoVmsFound);
        }
        vmids.sort_unstable();
        vmids.dedup();
        return Ok(vmids);
    }

    let mut vmids = BTreeSet::new();
    for part in selector.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        vmids.insert(parse_vmid(part)?);
    }

    if vmids.is_empty() {
        return Err(MigrateError::NoVmidsProvided);
    }

    Ok(vmids.into_iter().collect())
}

fn parse_vmid(token: &str) -> Result<VmId> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MigrateError::InvalidVmid(token.to_string()));
    }
    // all digits but too large for a VmId
    token
        .parse()
        .map_err(|_| MigrateError::InvalidVmid(token.to_string()))
}

/// Extract VM ids from `qm list` output.
///
/// ```text
/// VMID NAME STATUS MEM(MB) BOOTDISK(GB) PID
///  100 web  running 2048   32.00        1234
/// ```
pub fn parse_qm_list(stdout: &str) -> Vec<VmId> {
    let mut vmids: Vec<VmId> = stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .filter(|first| first.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|first| first.parse().ok())
        .collect();
    vmids.sort_unstable();
    vmids
}

/// Smallest id >= 100 not present in `used`.
pub fn lowest_free_vmid(used: &[VmId]) -> VmId {
    let used: BTreeSet<VmId> = used.iter().copied().collect();
    let mut vmid = 100;
    while used.contains(&vmid) {
        vmid += 1;
    }
    vmid
}
