//! Observability infrastructure for audit runs
//!
//! Provides:
//! - Prometheus metrics (evaluation latency, evaluated VMs, errors, findings by priority)
//! - Structured logging of audit events with tracing

use crate::rightsizing::Priority;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for per-VM evaluation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.0001, 0.0005, 0.001, 0.005, 0.01,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AuditMetricsInner> = OnceLock::new();

struct AuditMetricsInner {
    evaluation_latency_seconds: Histogram,
    vms_evaluated: IntCounter,
    vm_errors: IntCounter,
    warnings: IntCounter,
    findings: IntCounterVec,
    vms_by_priority: IntCounterVec,
}

impl AuditMetricsInner {
    fn new() -> Self {
        Self {
            evaluation_latency_seconds: register_histogram!(
                "numa_audit_evaluation_latency_seconds",
                "Time spent evaluating a single VM",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register evaluation_latency_seconds"),

            vms_evaluated: register_int_counter!(
                "numa_audit_vms_evaluated_total",
                "Number of VMs evaluated successfully"
            )
            .expect("Failed to register vms_evaluated"),

            vm_errors: register_int_counter!(
                "numa_audit_vm_errors_total",
                "Number of VMs that could not be evaluated"
            )
            .expect("Failed to register vm_errors"),

            warnings: register_int_counter!(
                "numa_audit_warnings_total",
                "Number of non-fatal issues raised during evaluation"
            )
            .expect("Failed to register warnings"),

            findings: register_int_counter_vec!(
                "numa_audit_findings_total",
                "Number of findings by priority",
                &["priority"]
            )
            .expect("Failed to register findings"),

            vms_by_priority: register_int_counter_vec!(
                "numa_audit_vms_by_priority_total",
                "Number of evaluated VMs by aggregated priority",
                &["priority"]
            )
            .expect("Failed to register vms_by_priority"),
        }
    }
}

/// Audit metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct AuditMetrics {
    _private: (),
}

impl Default for AuditMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AuditMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AuditMetricsInner {
        GLOBAL_METRICS.get_or_init(AuditMetricsInner::new)
    }

    pub fn observe_evaluation_latency(&self, duration_secs: f64) {
        self.inner().evaluation_latency_seconds.observe(duration_secs);
    }

    /// Count a successfully evaluated VM and its findings
    pub fn record_evaluation(&self, priority: Priority, finding_priorities: impl IntoIterator<Item = Priority>) {
        let inner = self.inner();
        inner.vms_evaluated.inc();
        inner.vms_by_priority.with_label_values(&[priority.as_str()]).inc();
        for p in finding_priorities {
            inner.findings.with_label_values(&[p.as_str()]).inc();
        }
    }

    pub fn inc_vm_errors(&self) {
        self.inner().vm_errors.inc();
    }

    pub fn inc_warnings(&self, count: u64) {
        self.inner().warnings.inc_by(count);
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        use prometheus::{Encoder, TextEncoder};

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Structured logger for audit events
#[derive(Clone)]
pub struct StructuredLogger {
    source: String,
}

impl StructuredLogger {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn log_audit_started(&self, vms: usize, hosts: usize, clusters: usize, parallel: bool) {
        info!(
            event = "audit_started",
            source = %self.source,
            vms = vms,
            hosts = hosts,
            clusters = clusters,
            parallel = parallel,
            "Starting vNUMA rightsizing audit"
        );
    }

    pub fn log_empty_inventory(&self) {
        info!(
            event = "audit_empty",
            source = %self.source,
            "Inventory contains no VMs, nothing to evaluate"
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn log_evaluation(
        &self,
        vm: &str,
        host: &str,
        sockets: u32,
        cores_per_socket: u32,
        optimal_sockets: u32,
        optimal_cores_per_socket: u32,
        priority: Priority,
    ) {
        debug!(
            event = "vm_evaluated",
            source = %self.source,
            vm = %vm,
            host = %host,
            sockets = sockets,
            cores_per_socket = cores_per_socket,
            optimal_sockets = optimal_sockets,
            optimal_cores_per_socket = optimal_cores_per_socket,
            priority = %priority,
            "Evaluated VM"
        );
    }

    pub fn log_vm_skipped(&self, vm: &str, reason: &str) {
        warn!(
            event = "vm_skipped",
            source = %self.source,
            vm = %vm,
            reason = %reason,
            "VM could not be evaluated"
        );
    }

    pub fn log_warning(&self, vm: &str, warning: &str) {
        warn!(
            event = "audit_warning",
            source = %self.source,
            vm = %vm,
            warning = %warning,
            "Evaluation warning"
        );
    }

    pub fn log_audit_completed(&self, evaluated: usize, errors: usize, unoptimized: usize, duration_ms: u64) {
        info!(
            event = "audit_completed",
            source = %self.source,
            evaluated = evaluated,
            errors = errors,
            unoptimized = unoptimized,
            duration_ms = duration_ms,
            "vNUMA rightsizing audit completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_metrics_recording() {
        let metrics = AuditMetrics::new();

        metrics.observe_evaluation_latency(0.00002);
        metrics.record_evaluation(Priority::High, [Priority::High, Priority::NotApplicable]);
        metrics.inc_vm_errors();
        metrics.inc_warnings(2);

        let text = metrics.render().unwrap();
        assert!(text.contains("numa_audit_vms_evaluated_total"));
        assert!(text.contains("numa_audit_findings_total{priority=\"HIGH\"}"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("vc01");
        assert_eq!(logger.source, "vc01");
    }
}
