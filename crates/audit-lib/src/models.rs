//! Core inventory records consumed by the audit

use serde::{Deserialize, Serialize};

/// Host power management policy as reported by the hypervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerPolicy {
    HighPerformance,
    Balanced,
    LowPower,
    Custom,
    #[default]
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl std::fmt::Display for PowerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PowerPolicy::HighPerformance => write!(f, "High Performance"),
            PowerPolicy::Balanced => write!(f, "Balanced"),
            PowerPolicy::LowPower => write!(f, "Low Power"),
            PowerPolicy::Custom => write!(f, "Custom"),
            PowerPolicy::NotAvailable => write!(f, "N/A"),
        }
    }
}

/// Virtual machine compute configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmRecord {
    pub name: String,
    #[serde(rename = "memoryGB")]
    pub memory_gb: f64,
    pub sockets: u32,
    pub cores_per_socket: u32,
    #[serde(rename = "numCPU")]
    pub num_cpu: u32,
    #[serde(default)]
    pub cpu_hot_add_enabled: bool,
    /// Versioned identifier, e.g. `vmx-13`
    pub hardware_version: String,
    pub host_id: String,
    /// VM-level `numa.vcpu.min` advanced setting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numa_vcpu_min_override: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_os: Option<String>,
}

/// Hypervisor host hardware description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRecord {
    pub name: String,
    pub id: String,
    /// Absent when the host is not part of a cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(rename = "memoryGB")]
    pub memory_gb: f64,
    pub sockets: u32,
    pub cores_per_socket: u32,
    #[serde(default)]
    pub hyperthreading_active: bool,
    #[serde(default)]
    pub power_policy: PowerPolicy,
    /// Host-wide `numa.vcpu.min` advanced setting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numa_vcpu_min_override: Option<u32>,
}

impl HostRecord {
    /// Memory attached to one physical NUMA node, assuming one node per socket
    pub fn mem_per_numa_node(&self) -> f64 {
        if self.sockets == 0 {
            return self.memory_gb;
        }
        self.memory_gb / self.sockets as f64
    }

    /// Physical cores across all sockets
    pub fn total_cores(&self) -> u32 {
        self.sockets.saturating_mul(self.cores_per_socket)
    }

    /// Logical processors as seen by the scheduler
    pub fn logical_processors(&self) -> u32 {
        if self.hyperthreading_active {
            self.total_cores().saturating_mul(2)
        } else {
            self.total_cores()
        }
    }
}

/// Cluster of hosts; members are derived from `HostRecord::cluster_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecord {
    pub name: String,
    pub id: String,
}

/// The three read-only tables an audit run works on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    /// Name of the management plane the tables were taken from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub vms: Vec<VmRecord>,
    #[serde(default)]
    pub hosts: Vec<HostRecord>,
    #[serde(default)]
    pub clusters: Vec<ClusterRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(sockets: u32, cores: u32, memory_gb: f64) -> HostRecord {
        HostRecord {
            name: "esx01".to_string(),
            id: "host-1".to_string(),
            cluster_id: None,
            memory_gb,
            sockets,
            cores_per_socket: cores,
            hyperthreading_active: true,
            power_policy: PowerPolicy::Balanced,
            numa_vcpu_min_override: None,
        }
    }

    #[test]
    fn test_host_derived_values() {
        let h = host(2, 12, 256.0);
        assert_eq!(h.mem_per_numa_node(), 128.0);
        assert_eq!(h.total_cores(), 24);
        assert_eq!(h.logical_processors(), 48);
    }

    #[test]
    fn test_inventory_deserializes_camel_case() {
        let json = r#"{
            "source": "vc01",
            "vms": [{
                "name": "db01", "memoryGB": 64, "sockets": 2, "coresPerSocket": 4,
                "numCPU": 8, "cpuHotAddEnabled": true, "hardwareVersion": "vmx-13",
                "hostId": "host-1", "numaVcpuMinOverride": 4
            }],
            "hosts": [{
                "name": "esx01", "id": "host-1", "clusterId": "c1", "memoryGB": 256,
                "sockets": 2, "coresPerSocket": 12, "powerPolicy": "N/A"
            }],
            "clusters": [{ "name": "prod", "id": "c1" }]
        }"#;

        let inv: Inventory = serde_json::from_str(json).unwrap();
        assert_eq!(inv.source.as_deref(), Some("vc01"));
        assert_eq!(inv.vms[0].num_cpu, 8);
        assert_eq!(inv.vms[0].numa_vcpu_min_override, Some(4));
        assert!(inv.vms[0].cpu_hot_add_enabled);
        assert_eq!(inv.hosts[0].power_policy, PowerPolicy::NotAvailable);
        assert!(!inv.hosts[0].hyperthreading_active);
        assert_eq!(inv.clusters[0].id, "c1");
    }
}
