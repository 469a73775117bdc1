//! Topology normalization
//!
//! Joins every VM to the host it runs on and to that host's cluster,
//! producing one [`EvaluationContext`] per VM. Lookup tables are built once
//! per run and are shared read-only between evaluations.

use crate::error::AuditError;
use crate::models::{ClusterRecord, HostRecord, Inventory, VmRecord};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Cluster-wide hardware minimums for the host under evaluation
///
/// All minimums are `None` when the host is unclustered, which disables every
/// cluster comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterContext {
    pub name: Option<String>,
    pub min_memory_gb: Option<f64>,
    pub min_sockets: Option<u32>,
    pub min_cores_per_socket: Option<u32>,
}

impl ClusterContext {
    /// Context for a host without a cluster
    pub fn unclustered() -> Self {
        Self::default()
    }

    /// Derive minimums from the member hosts of a cluster
    pub fn from_members<'a>(
        cluster: &ClusterRecord,
        members: impl IntoIterator<Item = &'a HostRecord>,
    ) -> Self {
        let mut ctx = Self {
            name: Some(cluster.name.clone()),
            ..Self::default()
        };

        for host in members {
            ctx.min_memory_gb = Some(match ctx.min_memory_gb {
                Some(m) => m.min(host.memory_gb),
                None => host.memory_gb,
            });
            ctx.min_sockets = Some(ctx.min_sockets.map_or(host.sockets, |m| m.min(host.sockets)));
            ctx.min_cores_per_socket = Some(
                ctx.min_cores_per_socket
                    .map_or(host.cores_per_socket, |m| m.min(host.cores_per_socket)),
            );
        }

        ctx
    }

    /// Whether minimums are available for comparison
    pub fn is_set(&self) -> bool {
        self.min_memory_gb.is_some() || self.min_sockets.is_some() || self.min_cores_per_socket.is_some()
    }

    /// Whether a host deviates from the cluster's smallest member
    pub fn differs_from(&self, host: &HostRecord) -> bool {
        let memory = self.min_memory_gb.is_some_and(|m| host.memory_gb != m);
        let sockets = self.min_sockets.is_some_and(|m| host.sockets != m);
        let cores = self.min_cores_per_socket.is_some_and(|m| host.cores_per_socket != m);
        memory || sockets || cores
    }
}

/// Everything needed to evaluate one VM
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    pub vm: &'a VmRecord,
    pub host: &'a HostRecord,
    pub cluster: ClusterContext,
}

/// A resolved context plus any non-fatal issues found while resolving it
#[derive(Debug, Clone)]
pub struct Normalized<'a> {
    pub context: EvaluationContext<'a>,
    pub warnings: Vec<AuditError>,
}

/// Read-only lookup tables for one audit run
pub struct TopologyIndex<'a> {
    hosts: HashMap<&'a str, &'a HostRecord>,
    clusters: HashMap<&'a str, ClusterContext>,
}

impl<'a> TopologyIndex<'a> {
    /// Index hosts by id and precompute cluster minimums
    pub fn build(inventory: &'a Inventory) -> Self {
        let mut hosts: HashMap<&str, &HostRecord> = HashMap::with_capacity(inventory.hosts.len());
        for host in &inventory.hosts {
            // First match wins on duplicate ids
            hosts.entry(host.id.as_str()).or_insert(host);
        }

        let mut members: HashMap<&str, Vec<&HostRecord>> = HashMap::new();
        for host in &inventory.hosts {
            if let Some(cluster_id) = host.cluster_id.as_deref() {
                members.entry(cluster_id).or_default().push(host);
            }
        }

        let mut clusters = HashMap::with_capacity(inventory.clusters.len());
        for cluster in &inventory.clusters {
            let ctx = ClusterContext::from_members(
                cluster,
                members.get(cluster.id.as_str()).into_iter().flatten().copied(),
            );
            debug!(
                cluster = %cluster.name,
                min_memory_gb = ?ctx.min_memory_gb,
                min_sockets = ?ctx.min_sockets,
                min_cores_per_socket = ?ctx.min_cores_per_socket,
                "Indexed cluster"
            );
            clusters.entry(cluster.id.as_str()).or_insert(ctx);
        }

        Self { hosts, clusters }
    }

    /// Look up a host by id
    pub fn host(&self, host_id: &str) -> Option<&'a HostRecord> {
        self.hosts.get(host_id).copied()
    }

    /// Cluster context for a host, if its cluster is known
    pub fn cluster_for(&self, host: &HostRecord) -> Option<&ClusterContext> {
        host.cluster_id
            .as_deref()
            .and_then(|id| self.clusters.get(id))
    }

    /// Resolve the evaluation context for a VM
    pub fn normalize(&self, vm: &'a VmRecord) -> Result<Normalized<'a>, AuditError> {
        let host = self.host(&vm.host_id).ok_or_else(|| AuditError::HostNotFound {
            vm: vm.name.clone(),
            host_id: vm.host_id.clone(),
        })?;

        let mut warnings = Vec::new();
        let cluster = match host.cluster_id.as_deref() {
            None => ClusterContext::unclustered(),
            Some(cluster_id) => match self.clusters.get(cluster_id) {
                Some(ctx) => ctx.clone(),
                None => {
                    warn!(
                        host = %host.name,
                        cluster_id = %cluster_id,
                        "Cluster not found, treating host as unclustered"
                    );
                    warnings.push(AuditError::ClusterNotFound {
                        host: host.name.clone(),
                        cluster_id: cluster_id.to_string(),
                    });
                    ClusterContext::unclustered()
                }
            },
        };

        Ok(Normalized {
            context: EvaluationContext { vm, host, cluster },
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PowerPolicy;

    fn host(id: &str, cluster: Option<&str>, memory_gb: f64, sockets: u32, cores: u32) -> HostRecord {
        HostRecord {
            name: format!("esx-{}", id),
            id: id.to_string(),
            cluster_id: cluster.map(str::to_string),
            memory_gb,
            sockets,
            cores_per_socket: cores,
            hyperthreading_active: false,
            power_policy: PowerPolicy::HighPerformance,
            numa_vcpu_min_override: None,
        }
    }

    fn vm(name: &str, host_id: &str) -> VmRecord {
        VmRecord {
            name: name.to_string(),
            memory_gb: 8.0,
            sockets: 1,
            cores_per_socket: 2,
            num_cpu: 2,
            cpu_hot_add_enabled: false,
            hardware_version: "vmx-19".to_string(),
            host_id: host_id.to_string(),
            numa_vcpu_min_override: None,
            power_state: None,
            guest_os: None,
        }
    }

    fn inventory() -> Inventory {
        Inventory {
            source: Some("vc01".to_string()),
            vms: vec![vm("app01", "h1"), vm("app02", "h3"), vm("orphan", "h404"), vm("lost", "h4")],
            hosts: vec![
                host("h1", Some("c1"), 128.0, 2, 16),
                host("h2", Some("c1"), 64.0, 2, 12),
                host("h3", None, 256.0, 4, 8),
                host("h4", Some("gone"), 64.0, 2, 8),
            ],
            clusters: vec![ClusterRecord {
                name: "prod".to_string(),
                id: "c1".to_string(),
            }],
        }
    }

    #[test]
    fn test_cluster_minimums_derived_from_members() {
        let inv = inventory();
        let index = TopologyIndex::build(&inv);
        let normalized = index.normalize(&inv.vms[0]).unwrap();

        let cluster = &normalized.context.cluster;
        assert_eq!(cluster.name.as_deref(), Some("prod"));
        assert_eq!(cluster.min_memory_gb, Some(64.0));
        assert_eq!(cluster.min_sockets, Some(2));
        assert_eq!(cluster.min_cores_per_socket, Some(12));
        assert!(cluster.differs_from(normalized.context.host));
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn test_unclustered_host_has_unset_minimums() {
        let inv = inventory();
        let index = TopologyIndex::build(&inv);
        let normalized = index.normalize(&inv.vms[1]).unwrap();

        assert!(!normalized.context.cluster.is_set());
        assert!(!normalized.context.cluster.differs_from(normalized.context.host));
    }

    #[test]
    fn test_missing_host_is_an_error() {
        let inv = inventory();
        let index = TopologyIndex::build(&inv);
        let err = index.normalize(&inv.vms[2]).unwrap_err();

        assert_eq!(
            err,
            AuditError::HostNotFound {
                vm: "orphan".to_string(),
                host_id: "h404".to_string()
            }
        );
    }

    #[test]
    fn test_missing_cluster_degrades_to_unclustered() {
        let inv = inventory();
        let index = TopologyIndex::build(&inv);
        let normalized = index.normalize(&inv.vms[3]).unwrap();

        assert!(!normalized.context.cluster.is_set());
        assert_eq!(normalized.warnings.len(), 1);
        assert!(matches!(normalized.warnings[0], AuditError::ClusterNotFound { .. }));
    }

    #[test]
    fn test_first_host_match_wins() {
        let mut inv = inventory();
        let mut dup = host("h1", None, 1.0, 1, 1);
        dup.name = "duplicate".to_string();
        inv.hosts.push(dup);

        let index = TopologyIndex::build(&inv);
        assert_eq!(index.host("h1").unwrap().name, "esx-h1");
    }

    #[test]
    fn test_empty_cluster_is_unset() {
        let cluster = ClusterRecord {
            name: "empty".to_string(),
            id: "c0".to_string(),
        };
        let ctx = ClusterContext::from_members(&cluster, std::iter::empty());
        assert_eq!(ctx.name.as_deref(), Some("empty"));
        assert!(!ctx.is_set());
    }
}
