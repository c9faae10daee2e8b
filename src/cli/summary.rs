use crate::VmId;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done(String),
    Failed(String),
}

/// Per-VM results of a batch run with `--continue-on-error`.
#[derive(Debug, Default)]
pub struct BatchSummary {
    rows: Vec<(VmId, Outcome)>,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, vmid: VmId, outcome: Outcome) {
        self.rows.push((vmid, outcome));
    }

    pub fn failures(&self) -> usize {
        self.rows
            .iter()
            .filter(|(_, outcome)| matches!(outcome, Outcome::Failed(_)))
            .count()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["VMID", "RESULT", "DETAIL"]);

        for (vmid, outcome) in &self.rows {
            let (result, detail) = match outcome {
                Outcome::Done(detail) => ("ok", detail.as_str()),
                Outcome::Failed(error) => ("FAILED", error.as_str()),
            };
            table.add_row(vec![vmid.to_string(), result.to_string(), detail.to_string()]);
        }

        table
    }

    pub fn print(&self) {
        println!("{}", self.table());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_failures() {
        let mut summary = BatchSummary::new();
        assert!(summary.is_empty());

        summary.record(101, Outcome::Done("vzdump-qemu-101-a.vma.zst".into()));
        summary.record(102, Outcome::Failed("vzdump failed for VM 102 (exit code 5)".into()));
        summary.record(103, Outcome::Done("vzdump-qemu-103-a.vma.zst".into()));

        assert_eq!(summary.len(), 3);
        assert_eq!(summary.failures(), 1);
    }

    #[test]
    fn test_table_lists_every_vm() {
        let mut summary = BatchSummary::new();
        summary.record(101, Outcome::Done("restored as 101".into()));
        summary.record(102, Outcome::Failed("No backup found".into()));

        let rendered = summary.table().to_string();
        assert!(rendered.contains("VMID"));
        assert!(rendered.contains("101"));
        assert!(rendered.contains("restored as 101"));
        assert!(rendered.contains("FAILED"));
        assert!(rendered.contains("No backup found"));
    }
}
