//! Rightsizing decision engine
//!
//! Evaluates a VM's vCPU layout against the physical NUMA topology of its
//! host and produces findings, a recommended layout and a priority.

mod evaluator;
mod exposure;
mod layout;
mod priority;


pub use evaluator::{Evaluation, EvaluatorConfig, RightsizingEvaluator};
pub use exposure::{
    parse_hardware_version, ExposureAssessment, ExposureCheck, OverrideSource,
    DEFAULT_NUMA_VCPU_MIN, VNUMA_MIN_HARDWARE_VERSION,
};
pub use layout::{search_layout, Layout, WideDimensions};
pub use priority::{aggregate, Priority};

use serde::{Deserialize, Serialize};

/// Rule that produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Fits one NUMA node but the layout does not match the host
    NotWideNotOptimal,
    /// Spans NUMA nodes with a layout that does not follow them
    WideNotOptimal,
    /// Host hardware differs from the smallest cluster member
    ClusterHeterogeneity,
    /// More vCPUs than the host has physical cores
    ExceedsPhysicalCores,
    /// Large VM on a host not running the high performance policy
    PowerPolicy,
}

/// One independent observation about a VM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    /// `NotApplicable` for informational findings
    pub priority: Priority,
    pub message: String,
    /// Advisory text appended to the message, in display order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Finding {
    pub fn new(kind: FindingKind, priority: Priority, message: impl Into<String>) -> Self {
        Self {
            kind,
            priority,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Message and notes as one display string
    pub fn render(&self) -> String {
        std::iter::once(self.message.trim())
            .chain(self.notes.iter().map(|n| n.trim()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
