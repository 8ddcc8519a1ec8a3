//! Recorded step-command trace, dumped to JSON for golden-trace comparison.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEntry {
    pub sequence: u64,
    pub motor_mask: u8,
    pub direction_mask: u8,
    pub interval_ticks: u16,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StepTrace {
    pub entries: Vec<TraceEntry>,
}

impl StepTrace {
    pub fn push(&mut self, motor_mask: u8, direction_mask: u8, interval_ticks: u16) {
        let sequence = self.entries.len() as u64;
        self.entries.push(TraceEntry { sequence, motor_mask, direction_mask, interval_ticks });
    }

    pub fn dump(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing trace")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).context("parsing trace json")
    }
}
