//! Priority aggregation

use super::Finding;
use serde::{Deserialize, Serialize};

/// Severity of a finding, ordered `NotApplicable < Low < Medium < High`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    #[serde(rename = "N/A")]
    NotApplicable,
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::NotApplicable => "N/A",
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduce findings to the highest priority and the optimized verdict
pub fn aggregate(findings: &[Finding]) -> (Priority, bool) {
    let priority = findings
        .iter()
        .map(|f| f.priority)
        .max()
        .unwrap_or_default();
    (priority, priority == Priority::NotApplicable)
}
