//! Result projection
//!
//! Shapes an evaluation into the output record. Full records carry source,
//! cluster, host and VM descriptive fields; simple records carry only the VM
//! identity and the recommendation.

use crate::rightsizing::{Evaluation, Finding, Priority};
use crate::topology::EvaluationContext;
use serde::{Deserialize, Serialize};

/// Separator between rendered findings in `details`
pub const DETAILS_SEPARATOR: &str = "; ";

/// Output field set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    #[default]
    Full,
    Simple,
}

/// Record with all descriptive fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullRecord {
    pub source: Option<String>,
    pub cluster: Option<String>,
    pub cluster_min_memory_gb: Option<f64>,
    pub cluster_min_sockets: Option<u32>,
    pub cluster_min_cores_per_socket: Option<u32>,
    pub host: String,
    pub host_memory_gb: f64,
    pub host_mem_per_numa_node_gb: f64,
    pub host_sockets: u32,
    pub host_cores_per_socket: u32,
    pub host_total_cores: u32,
    pub host_logical_processors: u32,
    pub host_hyperthreading_active: bool,
    pub host_power_policy: String,
    pub host_numa_vcpu_min: Option<u32>,
    pub vm: String,
    pub power_state: Option<String>,
    pub guest_os: Option<String>,
    pub memory_gb: f64,
    pub sockets: u32,
    pub cores_per_socket: u32,
    #[serde(rename = "numCPU")]
    pub num_cpu: u32,
    pub cpu_hot_add_enabled: bool,
    pub hardware_version: String,
    pub numa_vcpu_min: Option<u32>,
    pub optimal_sockets: u32,
    pub optimal_cores_per_socket: u32,
    pub priority: Priority,
    pub optimized: bool,
    pub details: String,
}

/// Record with VM identity and recommendation only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleRecord {
    pub vm: String,
    pub memory_gb: f64,
    pub sockets: u32,
    pub cores_per_socket: u32,
    #[serde(rename = "numCPU")]
    pub num_cpu: u32,
    pub optimal_sockets: u32,
    pub optimal_cores_per_socket: u32,
    pub priority: Priority,
    pub optimized: bool,
    pub details: String,
}

/// One row of audit output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultRecord {
    Full(FullRecord),
    Simple(SimpleRecord),
}

impl ResultRecord {
    pub fn vm(&self) -> &str {
        match self {
            ResultRecord::Full(r) => &r.vm,
            ResultRecord::Simple(r) => &r.vm,
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            ResultRecord::Full(r) => r.priority,
            ResultRecord::Simple(r) => r.priority,
        }
    }

    pub fn optimized(&self) -> bool {
        match self {
            ResultRecord::Full(r) => r.optimized,
            ResultRecord::Simple(r) => r.optimized,
        }
    }

    pub fn details(&self) -> &str {
        match self {
            ResultRecord::Full(r) => &r.details,
            ResultRecord::Simple(r) => &r.details,
        }
    }

    /// Current and recommended layout as `(sockets, cores_per_socket)` pairs
    pub fn layouts(&self) -> ((u32, u32), (u32, u32)) {
        match self {
            ResultRecord::Full(r) => (
                (r.sockets, r.cores_per_socket),
                (r.optimal_sockets, r.optimal_cores_per_socket),
            ),
            ResultRecord::Simple(r) => (
                (r.sockets, r.cores_per_socket),
                (r.optimal_sockets, r.optimal_cores_per_socket),
            ),
        }
    }
}

/// Join rendered findings for display
pub fn render_details(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(Finding::render)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(DETAILS_SEPARATOR)
}

/// Build the output record for one evaluated VM
pub fn project(
    ctx: &EvaluationContext<'_>,
    source: Option<&str>,
    evaluation: &Evaluation,
    priority: Priority,
    optimized: bool,
    mode: ReportMode,
) -> ResultRecord {
    let vm = ctx.vm;
    let details = render_details(&evaluation.findings);

    match mode {
        ReportMode::Simple => ResultRecord::Simple(SimpleRecord {
            vm: vm.name.clone(),
            memory_gb: vm.memory_gb,
            sockets: vm.sockets,
            cores_per_socket: vm.cores_per_socket,
            num_cpu: vm.num_cpu,
            optimal_sockets: evaluation.optimal.sockets,
            optimal_cores_per_socket: evaluation.optimal.cores_per_socket,
            priority,
            optimized,
            details,
        }),
        ReportMode::Full => {
            let host = ctx.host;
            ResultRecord::Full(FullRecord {
                source: source.map(str::to_string),
                cluster: ctx.cluster.name.clone(),
                cluster_min_memory_gb: ctx.cluster.min_memory_gb,
                cluster_min_sockets: ctx.cluster.min_sockets,
                cluster_min_cores_per_socket: ctx.cluster.min_cores_per_socket,
                host: host.name.clone(),
                host_memory_gb: host.memory_gb,
                host_mem_per_numa_node_gb: host.mem_per_numa_node(),
                host_sockets: host.sockets,
                host_cores_per_socket: host.cores_per_socket,
                host_total_cores: host.total_cores(),
                host_logical_processors: host.logical_processors(),
                host_hyperthreading_active: host.hyperthreading_active,
                host_power_policy: host.power_policy.to_string(),
                host_numa_vcpu_min: host.numa_vcpu_min_override,
                vm: vm.name.clone(),
                power_state: vm.power_state.clone(),
                guest_os: vm.guest_os.clone(),
                memory_gb: vm.memory_gb,
                sockets: vm.sockets,
                cores_per_socket: vm.cores_per_socket,
                num_cpu: vm.num_cpu,
                cpu_hot_add_enabled: vm.cpu_hot_add_enabled,
                hardware_version: vm.hardware_version.clone(),
                numa_vcpu_min: vm.numa_vcpu_min_override,
                optimal_sockets: evaluation.optimal.sockets,
                optimal_cores_per_socket: evaluation.optimal.cores_per_socket,
                priority,
                optimized,
                details,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HostRecord, PowerPolicy, VmRecord};
    use crate::rightsizing::{aggregate, FindingKind, RightsizingEvaluator};
    use crate::topology::ClusterContext;

    fn fixtures() -> (VmRecord, HostRecord) {
        let vm = VmRecord {
            name: "sql01".to_string(),
            memory_gb: 96.0,
            sockets: 1,
            cores_per_socket: 12,
            num_cpu: 12,
            cpu_hot_add_enabled: false,
            hardware_version: "vmx-15".to_string(),
            host_id: "h1".to_string(),
            numa_vcpu_min_override: None,
            power_state: Some("poweredOn".to_string()),
            guest_os: Some("Windows Server 2019".to_string()),
        };
        let host = HostRecord {
            name: "esx01".to_string(),
            id: "h1".to_string(),
            cluster_id: None,
            memory_gb: 128.0,
            sockets: 2,
            cores_per_socket: 8,
            hyperthreading_active: true,
            power_policy: PowerPolicy::Balanced,
            numa_vcpu_min_override: None,
        };
        (vm, host)
    }

    #[test]
    fn test_details_join_without_separator_artifacts() {
        let findings = vec![
            Finding::new(FindingKind::WideNotOptimal, Priority::High, " first ").with_note("note"),
            Finding::new(FindingKind::PowerPolicy, Priority::NotApplicable, "  "),
            Finding::new(FindingKind::ClusterHeterogeneity, Priority::Medium, "second"),
        ];
        assert_eq!(render_details(&findings), "first note; second");
        assert_eq!(render_details(&[]), "");
    }

    #[test]
    fn test_full_and_simple_projection() {
        let (vm, host) = fixtures();
        let ctx = EvaluationContext {
            vm: &vm,
            host: &host,
            cluster: ClusterContext::unclustered(),
        };
        let evaluation = RightsizingEvaluator::new().evaluate(&ctx).unwrap();
        let (priority, optimized) = aggregate(&evaluation.findings);

        let full = project(&ctx, Some("vc01"), &evaluation, priority, optimized, ReportMode::Full);
        let simple = project(&ctx, Some("vc01"), &evaluation, priority, optimized, ReportMode::Simple);

        assert_eq!(full.vm(), "sql01");
        assert_eq!(full.priority(), Priority::High);
        assert_eq!(full.details(), simple.details());
        assert_eq!(full.layouts(), simple.layouts());
        assert_eq!(full.layouts().1, (2, 6));

        match &full {
            ResultRecord::Full(r) => {
                assert_eq!(r.source.as_deref(), Some("vc01"));
                assert_eq!(r.host_mem_per_numa_node_gb, 64.0);
                assert_eq!(r.host_logical_processors, 32);
                assert_eq!(r.host_power_policy, "Balanced");
                assert!(r.cluster.is_none());
            }
            ResultRecord::Simple(_) => panic!("expected full record"),
        }

        let json = serde_json::to_value(&simple).unwrap();
        assert_eq!(json["priority"], "HIGH");
        assert_eq!(json["numCPU"], 12);
        assert!(json.get("host").is_none());
    }
}
