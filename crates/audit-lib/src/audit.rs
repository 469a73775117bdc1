//! Batch audit driver
//!
//! Runs normalization, evaluation, aggregation and projection for every VM
//! of an inventory. VMs are independent: a VM that cannot be resolved or
//! evaluated is reported as an issue and the rest of the batch continues.

use crate::error::AuditError;
use crate::models::{Inventory, VmRecord};
use crate::observability::{AuditMetrics, StructuredLogger};
use crate::report::{project, ReportMode, ResultRecord};
use crate::rightsizing::{aggregate, EvaluatorConfig, Priority, RightsizingEvaluator};
use crate::topology::TopologyIndex;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Options for one audit run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRequest {
    pub mode: ReportMode,
    /// Case-insensitive substring match on VM names
    pub vm_filter: Option<String>,
    /// Evaluate on the rayon worker pool
    pub parallel: bool,
}

impl Default for AuditRequest {
    fn default() -> Self {
        Self {
            mode: ReportMode::Full,
            vm_filter: None,
            parallel: true,
        }
    }
}

impl AuditRequest {
    fn selects(&self, vm: &VmRecord) -> bool {
        self.vm_filter
            .as_ref()
            .map(|f| vm.name.to_lowercase().contains(&f.to_lowercase()))
            .unwrap_or(true)
    }
}

/// A VM-scoped error or warning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmIssue {
    pub vm: String,
    pub reason: String,
}

impl VmIssue {
    fn new(vm: &str, error: &AuditError) -> Self {
        Self {
            vm: vm.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Counts over one audit run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub selected: usize,
    pub evaluated: usize,
    pub errors: usize,
    pub warnings: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub optimized: usize,
}

impl AuditSummary {
    fn count(&mut self, priority: Priority) {
        match priority {
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
            Priority::NotApplicable => self.optimized += 1,
        }
    }
}

/// Output of an audit run, results in input order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub source: Option<String>,
    pub mode: ReportMode,
    pub results: Vec<ResultRecord>,
    pub errors: Vec<VmIssue>,
    pub warnings: Vec<VmIssue>,
    pub summary: AuditSummary,
}

enum Outcome {
    Evaluated {
        record: ResultRecord,
        warnings: Vec<VmIssue>,
    },
    Failed {
        error: VmIssue,
        warnings: Vec<VmIssue>,
    },
}

/// Evaluates every VM of an inventory
pub struct Auditor {
    evaluator: RightsizingEvaluator,
    metrics: AuditMetrics,
}

impl Default for Auditor {
    fn default() -> Self {
        Self::new(EvaluatorConfig::default())
    }
}

impl Auditor {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self {
            evaluator: RightsizingEvaluator::with_config(config),
            metrics: AuditMetrics::new(),
        }
    }

    /// Run the audit over all selected VMs
    pub fn run(&self, inventory: &Inventory, request: &AuditRequest) -> AuditReport {
        let started = Instant::now();
        let logger = StructuredLogger::new(inventory.source.as_deref().unwrap_or("inventory"));
        let index = TopologyIndex::build(inventory);

        let selected: Vec<&VmRecord> = inventory.vms.iter().filter(|vm| request.selects(vm)).collect();
        logger.log_audit_started(
            selected.len(),
            inventory.hosts.len(),
            inventory.clusters.len(),
            request.parallel,
        );
        if selected.is_empty() {
            logger.log_empty_inventory();
        }

        let source = inventory.source.as_deref();
        let audit_one = |vm| self.audit_vm(vm, &index, source, request.mode, &logger);
        let outcomes: Vec<Outcome> = if request.parallel {
            selected.par_iter().copied().map(audit_one).collect()
        } else {
            selected.iter().copied().map(audit_one).collect()
        };

        let mut summary = AuditSummary {
            selected: selected.len(),
            ..AuditSummary::default()
        };
        let mut results = Vec::with_capacity(outcomes.len());
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for outcome in outcomes {
            match outcome {
                Outcome::Evaluated { record, warnings: w } => {
                    summary.count(record.priority());
                    warnings.extend(w);
                    results.push(record);
                }
                Outcome::Failed { error, warnings: w } => {
                    warnings.extend(w);
                    errors.push(error);
                }
            }
        }

        summary.evaluated = results.len();
        summary.errors = errors.len();
        summary.warnings = warnings.len();

        logger.log_audit_completed(
            summary.evaluated,
            summary.errors,
            summary.evaluated - summary.optimized,
            started.elapsed().as_millis() as u64,
        );

        AuditReport {
            generated_at: Utc::now(),
            source: inventory.source.clone(),
            mode: request.mode,
            results,
            errors,
            warnings,
            summary,
        }
    }

    fn audit_vm<'a>(
        &self,
        vm: &'a VmRecord,
        index: &TopologyIndex<'a>,
        source: Option<&str>,
        mode: ReportMode,
        logger: &StructuredLogger,
    ) -> Outcome {
        let started = Instant::now();

        let normalized = match index.normalize(vm) {
            Ok(n) => n,
            Err(e) => return self.failed(vm, e, Vec::new(), logger),
        };
        let mut warnings: Vec<VmIssue> = normalized
            .warnings
            .iter()
            .map(|w| VmIssue::new(&vm.name, w))
            .collect();

        let ctx = normalized.context;
        let evaluation = match self.evaluator.evaluate(&ctx) {
            Ok(e) => e,
            Err(e) => return self.failed(vm, e, warnings, logger),
        };
        warnings.extend(evaluation.warnings.iter().map(|w| VmIssue::new(&vm.name, w)));

        let (priority, optimized) = aggregate(&evaluation.findings);
        let record = project(&ctx, source, &evaluation, priority, optimized, mode);

        self.metrics
            .observe_evaluation_latency(started.elapsed().as_secs_f64());
        self.metrics
            .record_evaluation(priority, evaluation.findings.iter().map(|f| f.priority));
        if !warnings.is_empty() {
            self.metrics.inc_warnings(warnings.len() as u64);
            for w in &warnings {
                logger.log_warning(&w.vm, &w.reason);
            }
        }
        logger.log_evaluation(
            &vm.name,
            &ctx.host.name,
            vm.sockets,
            vm.cores_per_socket,
            evaluation.optimal.sockets,
            evaluation.optimal.cores_per_socket,
            priority,
        );

        Outcome::Evaluated { record, warnings }
    }

    fn failed(
        &self,
        vm: &VmRecord,
        error: AuditError,
        warnings: Vec<VmIssue>,
        logger: &StructuredLogger,
    ) -> Outcome {
        self.metrics.inc_vm_errors();
        let error = VmIssue::new(&vm.name, &error);
        logger.log_vm_skipped(&error.vm, &error.reason);
        Outcome::Failed { error, warnings }
    }
}
