use regex::Regex;
use std::collections::VecDeque;
use std::sync::OnceLock;

/// Lines of subprocess output kept for diagnostics.
pub const TAIL_LINES: usize = 40;

pub const PROGRESS_TOTAL: u64 = 100;

fn percent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,3})%").expect("valid percent regex"))
}

/// First `N%` token in a line, clamped to 100.
pub fn extract_percent(line: &str) -> Option<u64> {
    let caps = percent_re().captures(line)?;
    let pct: u64 = caps[1].parse().ok()?;
    Some(pct.min(PROGRESS_TOTAL))
}

/// Progress and output tail for one running export.
///
/// The counter only moves forward: repeated or lower percentages are ignored.
#[derive(Debug, Clone, Default)]
pub struct ProgressState {
    last_percent: u64,
    tail: VecDeque<String>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line of output; returns how far the counter advances.
    pub fn observe(&mut self, line: &str) -> u64 {
        let line = line.trim_end_matches(['\r', '\n']);
        if !line.is_empty() {
            if self.tail.len() == TAIL_LINES {
                self.tail.pop_front();
            }
            self.tail.push_back(line.to_string());
        }

        match extract_percent(line) {
            Some(pct) if pct > self.last_percent => {
                let delta = pct - self.last_percent;
                self.last_percent = pct;
                delta
            }
            _ => 0,
        }
    }

    /// Close out the counter. A successful run always ends at 100.
    pub fn complete(&mut self, success: bool) -> u64 {
        if success && self.last_percent < PROGRESS_TOTAL {
            let delta = PROGRESS_TOTAL - self.last_percent;
            self.last_percent = PROGRESS_TOTAL;
            delta
        } else {
            0
        }
    }

    pub fn percent(&self) -> u64 {
        self.last_percent
    }

    pub fn tail(&self) -> Vec<String> {
        self.tail.iter().cloned().collect()
    }
}
