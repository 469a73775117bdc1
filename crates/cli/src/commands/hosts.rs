//! Host NUMA overview command

use anyhow::Result;
use audit_lib::inventory::{InventoryProvider, JsonInventoryFile};
use audit_lib::TopologyIndex;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{format_gb, format_opt, print_table, OutputFormat};

/// Row for the hosts table
#[derive(Tabled, Serialize)]
#[serde(rename_all = "camelCase")]
struct HostRow {
    #[tabled(rename = "Host")]
    name: String,
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Mem/NUMA")]
    mem_per_numa_node: String,
    #[tabled(rename = "Sockets")]
    sockets: u32,
    #[tabled(rename = "Cores/Socket")]
    cores_per_socket: u32,
    #[tabled(rename = "Cores")]
    total_cores: u32,
    #[tabled(rename = "HT")]
    hyperthreading: String,
    #[tabled(rename = "Power Policy")]
    power_policy: String,
    #[tabled(rename = "Cluster Min")]
    cluster_minimum: String,
}

/// Print the physical NUMA layout of every host in an inventory
pub async fn show_hosts(inventory_path: &Path, format: OutputFormat) -> Result<()> {
    let inventory = JsonInventoryFile::new(inventory_path).fetch().await?;
    let index = TopologyIndex::build(&inventory);

    let rows: Vec<HostRow> = inventory
        .hosts
        .iter()
        .map(|host| {
            let cluster = index.cluster_for(host);
            HostRow {
                name: host.name.clone(),
                cluster: format_opt(cluster.and_then(|c| c.name.clone())),
                memory: format_gb(host.memory_gb),
                mem_per_numa_node: format_gb(host.mem_per_numa_node()),
                sockets: host.sockets,
                cores_per_socket: host.cores_per_socket,
                total_cores: host.total_cores(),
                hyperthreading: if host.hyperthreading_active { "on" } else { "off" }.to_string(),
                power_policy: host.power_policy.to_string(),
                cluster_minimum: match cluster.filter(|c| c.is_set()) {
                    Some(c) => format!(
                        "{} / {}x{}",
                        format_opt(c.min_memory_gb.map(format_gb)),
                        format_opt(c.min_sockets),
                        format_opt(c.min_cores_per_socket)
                    ),
                    None => "-".to_string(),
                },
            }
        })
        .collect();

    print_table(&rows, format)
}
