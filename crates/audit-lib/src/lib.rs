//! Audit library for vNUMA rightsizing
//!
//! This crate provides the core functionality for:
//! - Inventory acquisition through pluggable providers
//! - Topology normalization (VM -> host -> cluster)
//! - Rightsizing evaluation against the physical NUMA layout
//! - Priority aggregation and result projection
//! - Observability for audit runs

pub mod audit;
pub mod error;
pub mod inventory;
pub mod models;
pub mod observability;
pub mod report;
pub mod rightsizing;
pub mod topology;

pub use audit::{AuditReport, AuditRequest, AuditSummary, Auditor, VmIssue};
pub use error::AuditError;
pub use models::*;
pub use observability::{AuditMetrics, StructuredLogger};
pub use report::{FullRecord, ReportMode, ResultRecord, SimpleRecord};
pub use rightsizing::{EvaluatorConfig, Finding, FindingKind, Priority, RightsizingEvaluator};
pub use topology::{ClusterContext, EvaluationContext, TopologyIndex};
