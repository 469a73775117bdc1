//! Wide detection and optimal socket layout search

use crate::models::{HostRecord, VmRecord};
use serde::{Deserialize, Serialize};

/// Which dimensions of a VM span more than one physical NUMA node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WideDimensions {
    pub memory: bool,
    pub cpu: bool,
}

impl WideDimensions {
    /// Compare a VM against one NUMA node of its host
    ///
    /// Cores per socket stand in for cores per NUMA node.
    pub fn detect(vm: &VmRecord, host: &HostRecord) -> Self {
        Self {
            memory: vm.memory_gb > host.mem_per_numa_node(),
            cpu: vm.num_cpu > host.cores_per_socket,
        }
    }

    pub fn any(&self) -> bool {
        self.memory || self.cpu
    }

    /// Human-readable dimension list, `None` when not wide
    pub fn describe(&self) -> Option<&'static str> {
        match (self.memory, self.cpu) {
            (true, true) => Some("memory and CPU"),
            (true, false) => Some("memory"),
            (false, true) => Some("CPU"),
            (false, false) => None,
        }
    }
}

/// A virtual socket layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub sockets: u32,
    pub cores_per_socket: u32,
}

impl Layout {
    pub fn new(sockets: u32, cores_per_socket: u32) -> Self {
        Self {
            sockets,
            cores_per_socket,
        }
    }

    pub fn vcpus(&self) -> u32 {
        self.sockets.saturating_mul(self.cores_per_socket)
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.sockets, self.cores_per_socket)
    }
}

/// Find the layout using the fewest sockets that keeps each socket within one NUMA node
///
/// Candidates are the divisors of `vcpus` in ascending order; the first one
/// satisfying both the memory and the core bound wins. A single core per
/// socket always satisfies both, so the search terminates for `vcpus >= 1`.
pub fn search_layout(memory_gb: f64, vcpus: u32, host: &HostRecord) -> Layout {
    let mem_per_node = host.mem_per_numa_node();
    let whole_host = vcpus == host.total_cores();

    for sockets in 1..=vcpus.max(1) {
        if vcpus % sockets != 0 {
            continue;
        }
        let cores = vcpus / sockets;
        let single_core = cores == 1;

        let memory_fits = memory_gb / sockets as f64 <= mem_per_node || single_core;
        let cores_fit = cores <= host.cores_per_socket || single_core || whole_host;

        if memory_fits && cores_fit {
            return Layout::new(sockets, cores);
        }
    }

    Layout::new(vcpus.max(1), 1)
}
