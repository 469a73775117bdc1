//! Per-VM rightsizing evaluation

use super::exposure::{
    parse_hardware_version, ExposureAssessment, DEFAULT_NUMA_VCPU_MIN, VNUMA_MIN_HARDWARE_VERSION,
};
use super::layout::{search_layout, Layout, WideDimensions};
use super::{Finding, FindingKind, Priority};
use crate::error::AuditError;
use crate::models::PowerPolicy;
use crate::topology::EvaluationContext;
use serde::{Deserialize, Serialize};

/// vCPU count above which the host power policy matters
pub const POWER_POLICY_VCPU_THRESHOLD: u32 = 8;

/// Thresholds used by the rightsizing rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// First virtual hardware version exposing vNUMA
    pub min_vnuma_hardware_version: u32,
    /// Hypervisor default for `numa.vcpu.min`
    pub default_numa_vcpu_min: u32,
    /// VMs with more vCPUs get the power policy advisory
    pub power_policy_vcpu_threshold: u32,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            min_vnuma_hardware_version: VNUMA_MIN_HARDWARE_VERSION,
            default_numa_vcpu_min: DEFAULT_NUMA_VCPU_MIN,
            power_policy_vcpu_threshold: POWER_POLICY_VCPU_THRESHOLD,
        }
    }
}

/// Everything the evaluator decided about one VM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub wide: WideDimensions,
    /// vCPU count the layout search ran on
    pub calc_vcpus: u32,
    pub odd_vcpus: bool,
    /// Current layout already matches the search result
    pub layout_optimal: bool,
    pub optimal: Layout,
    pub exposure: ExposureAssessment,
    pub findings: Vec<Finding>,
    /// Non-fatal issues, e.g. an unparseable hardware version
    #[serde(skip)]
    pub warnings: Vec<AuditError>,
}

/// Applies the rightsizing rules to an evaluation context
#[derive(Debug, Clone, Default)]
pub struct RightsizingEvaluator {
    config: EvaluatorConfig,
}

impl RightsizingEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate one VM against its host and cluster
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Evaluation, AuditError> {
        validate(ctx)?;

        let vm = ctx.vm;
        let host = ctx.host;

        let wide = WideDimensions::detect(vm, host);
        let odd_vcpus = wide.any() && vm.num_cpu % 2 == 1;
        let calc_vcpus = if odd_vcpus {
            vm.num_cpu
                .checked_add(1)
                .ok_or_else(|| AuditError::InvalidTopology {
                    vm: vm.name.clone(),
                    reason: format!("{} vCPUs cannot be rounded up to an even count", vm.num_cpu),
                })?
        } else {
            vm.num_cpu
        };

        let mut optimal = search_layout(vm.memory_gb, calc_vcpus, host);
        let layout_optimal = optimal.sockets == vm.sockets
            && optimal.cores_per_socket == vm.cores_per_socket
            && !odd_vcpus;

        let mut warnings = Vec::new();
        let hardware_version = parse_hardware_version(&vm.hardware_version);
        if hardware_version.is_none() {
            tracing::warn!(
                vm = %vm.name,
                identifier = %vm.hardware_version,
                "Malformed hardware version, assuming vNUMA is not exposed"
            );
            warnings.push(AuditError::MalformedVersionIdentifier {
                vm: vm.name.clone(),
                identifier: vm.hardware_version.clone(),
            });
        }
        let exposure = ExposureAssessment::assess(
            vm,
            host,
            hardware_version,
            self.config.min_vnuma_hardware_version,
            self.config.default_numa_vcpu_min,
        );

        let mut findings = Vec::new();

        if !wide.any() && !layout_optimal {
            findings.push(Finding::new(
                FindingKind::NotWideNotOptimal,
                Priority::Low,
                format!(
                    "VM is not wide but its {}x{} layout does not match the pNUMA architecture, use {} (sockets x cores).",
                    vm.sockets, vm.cores_per_socket, optimal
                ),
            ));
        }

        if let Some(dimensions) = wide.describe().filter(|_| !layout_optimal) {
            let mut finding = Finding::new(
                FindingKind::WideNotOptimal,
                Priority::High,
                format!(
                    "VM is wide on {}, distribute it across as few pNUMA nodes as possible with {} (sockets x cores).",
                    dimensions, optimal
                ),
            );
            for check in &exposure.checks {
                finding = finding.with_note(check.message());
            }
            if odd_vcpus {
                finding = finding.with_note(format!(
                    "The odd vCPU count of {} cannot be split evenly across pNUMA nodes, which compounds the spanning.",
                    vm.num_cpu
                ));
            }
            findings.push(finding);
        }

        if ctx.cluster.is_set() && ctx.cluster.differs_from(host) {
            findings.push(Finding::new(
                FindingKind::ClusterHeterogeneity,
                Priority::Medium,
                format!(
                    "Host hardware differs from the smallest host in cluster {}, size VMs to the cluster minimum ({} GB, {} sockets, {} cores per socket) instead of this host.",
                    ctx.cluster.name.as_deref().unwrap_or("-"),
                    ctx.cluster.min_memory_gb.map_or_else(|| "-".to_string(), |m| m.to_string()),
                    ctx.cluster.min_sockets.map_or_else(|| "-".to_string(), |m| m.to_string()),
                    ctx.cluster.min_cores_per_socket.map_or_else(|| "-".to_string(), |m| m.to_string()),
                ),
            ));
        }

        if vm.num_cpu > host.total_cores() {
            optimal = Layout::new(host.sockets, host.cores_per_socket);
            findings.push(Finding::new(
                FindingKind::ExceedsPhysicalCores,
                Priority::Medium,
                format!(
                    "VM has {} vCPUs but the host only has {} physical cores, reduce the vCPU count.",
                    vm.num_cpu,
                    host.total_cores()
                ),
            ));
        }

        if vm.num_cpu > self.config.power_policy_vcpu_threshold
            && !matches!(
                host.power_policy,
                PowerPolicy::HighPerformance | PowerPolicy::NotAvailable
            )
        {
            findings.push(Finding::new(
                FindingKind::PowerPolicy,
                Priority::NotApplicable,
                format!(
                    "Host power policy is {}, use High Performance for VMs with more than {} vCPUs.",
                    host.power_policy, self.config.power_policy_vcpu_threshold
                ),
            ));
        }

        Ok(Evaluation {
            wide,
            calc_vcpus,
            odd_vcpus,
            layout_optimal,
            optimal,
            exposure,
            findings,
            warnings,
        })
    }
}

fn validate(ctx: &EvaluationContext<'_>) -> Result<(), AuditError> {
    let vm = ctx.vm;
    let host = ctx.host;

    let reason = if vm.sockets == 0 || vm.cores_per_socket == 0 || vm.num_cpu == 0 {
        Some("VM sockets, cores per socket and vCPU count must be at least 1".to_string())
    } else if vm.sockets.checked_mul(vm.cores_per_socket) != Some(vm.num_cpu) {
        Some(format!(
            "{} vCPUs do not match the {}x{} layout",
            vm.num_cpu, vm.sockets, vm.cores_per_socket
        ))
    } else if !vm.memory_gb.is_finite() || vm.memory_gb < 0.0 {
        Some(format!("VM memory {} GB is not a valid size", vm.memory_gb))
    } else if host.sockets == 0 || host.cores_per_socket == 0 {
        Some(format!("host '{}' reports no sockets or cores", host.name))
    } else if !host.memory_gb.is_finite() || host.memory_gb < 0.0 {
        Some(format!("host '{}' memory {} GB is not a valid size", host.name, host.memory_gb))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AuditError::InvalidTopology {
            vm: vm.name.clone(),
            reason,
        }),
        None => Ok(()),
    }
}
