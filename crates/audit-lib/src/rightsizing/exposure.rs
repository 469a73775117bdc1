//! Guest NUMA exposure
//!
//! A VM only benefits from a NUMA-aligned layout when the hypervisor exposes
//! virtual NUMA to the guest. Exposure requires a recent enough virtual
//! hardware version, CPU hot-add disabled, and a vCPU count at or above
//! `numa.vcpu.min` (unless the setting is overridden).

use crate::models::{HostRecord, VmRecord};
use serde::{Deserialize, Serialize};

/// First virtual hardware version that exposes vNUMA to guests
pub const VNUMA_MIN_HARDWARE_VERSION: u32 = 8;

/// Default `numa.vcpu.min`: VMs with fewer vCPUs get no vNUMA topology
pub const DEFAULT_NUMA_VCPU_MIN: u32 = 9;

/// Parse a versioned identifier such as `vmx-13` into its number
pub fn parse_hardware_version(identifier: &str) -> Option<u32> {
    let trimmed = identifier.trim();
    let digits = trimmed
        .get(..3)
        .filter(|prefix| prefix.eq_ignore_ascii_case("vmx"))
        .map(|_| {
            let rest = &trimmed[3..];
            rest.strip_prefix('-').unwrap_or(rest)
        })
        .unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Where an effective `numa.vcpu.min` value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideSource {
    Vm,
    Host,
}

impl std::fmt::Display for OverrideSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverrideSource::Vm => write!(f, "VM"),
            OverrideSource::Host => write!(f, "host"),
        }
    }
}

/// Outcome of one exposure check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum ExposureCheck {
    /// `version` is `None` when the identifier could not be parsed
    OldHardware { version: Option<u32>, minimum: u32 },
    HotAddEnabled,
    BelowDefaultThreshold { vcpus: u32, threshold: u32 },
    OverrideTooHigh { value: u32, source: OverrideSource, vcpus: u32 },
    ExposedByOverride { value: u32, source: OverrideSource },
}

impl ExposureCheck {
    /// Whether this check keeps vNUMA hidden from the guest
    pub fn blocks_exposure(&self) -> bool {
        !matches!(self, ExposureCheck::ExposedByOverride { .. })
    }

    pub fn message(&self) -> String {
        match self {
            ExposureCheck::OldHardware { version: Some(v), minimum } => format!(
                "pNUMA is not exposed to the guest OS: virtual hardware version {} is below {}, upgrade the VM hardware.",
                v, minimum
            ),
            ExposureCheck::OldHardware { version: None, minimum } => format!(
                "pNUMA is not exposed to the guest OS: virtual hardware version is unknown and assumed below {}.",
                minimum
            ),
            ExposureCheck::HotAddEnabled => {
                "pNUMA is not exposed to the guest OS: CPU hot-add is enabled, which disables vNUMA.".to_string()
            }
            ExposureCheck::BelowDefaultThreshold { vcpus, threshold } => format!(
                "pNUMA is not exposed to the guest OS: {} vCPUs is below the default numa.vcpu.min of {}, set numa.vcpu.min to {} or lower.",
                vcpus, threshold, vcpus
            ),
            ExposureCheck::OverrideTooHigh { value, source, vcpus } => format!(
                "pNUMA is not exposed to the guest OS: {} numa.vcpu.min of {} is above the {} vCPUs of this VM, lower it to {} or less.",
                source, value, vcpus, vcpus
            ),
            ExposureCheck::ExposedByOverride { value, source } => format!(
                "pNUMA is exposed to the guest OS through the {} numa.vcpu.min of {}.",
                source, value
            ),
        }
    }
}

/// Result of all exposure checks for one VM
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureAssessment {
    pub checks: Vec<ExposureCheck>,
}

impl ExposureAssessment {
    /// Run the exposure checks
    ///
    /// The VM-level override takes precedence over the host-level one.
    pub fn assess(
        vm: &VmRecord,
        host: &HostRecord,
        hardware_version: Option<u32>,
        min_hardware_version: u32,
        default_vcpu_min: u32,
    ) -> Self {
        let mut checks = Vec::new();

        if hardware_version.map_or(true, |v| v < min_hardware_version) {
            checks.push(ExposureCheck::OldHardware {
                version: hardware_version,
                minimum: min_hardware_version,
            });
        }

        if vm.cpu_hot_add_enabled {
            checks.push(ExposureCheck::HotAddEnabled);
        }

        if vm.num_cpu < default_vcpu_min {
            let effective = vm
                .numa_vcpu_min_override
                .map(|v| (v, OverrideSource::Vm))
                .or_else(|| host.numa_vcpu_min_override.map(|v| (v, OverrideSource::Host)));

            checks.push(match effective {
                None => ExposureCheck::BelowDefaultThreshold {
                    vcpus: vm.num_cpu,
                    threshold: default_vcpu_min,
                },
                Some((value, source)) if value <= vm.num_cpu => {
                    ExposureCheck::ExposedByOverride { value, source }
                }
                Some((value, source)) => ExposureCheck::OverrideTooHigh {
                    value,
                    source,
                    vcpus: vm.num_cpu,
                },
            });
        }

        Self { checks }
    }

    /// Whether the guest sees the NUMA topology
    pub fn exposed(&self) -> bool {
        !self.checks.iter().any(ExposureCheck::blocks_exposure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PowerPolicy;

    fn vm(num_cpu: u32, hot_add: bool, override_value: Option<u32>) -> VmRecord {
        VmRecord {
            name: "vm1".to_string(),
            memory_gb: 16.0,
            sockets: 1,
            cores_per_socket: num_cpu,
            num_cpu,
            cpu_hot_add_enabled: hot_add,
            hardware_version: "vmx-14".to_string(),
            host_id: "h1".to_string(),
            numa_vcpu_min_override: override_value,
            power_state: None,
            guest_os: None,
        }
    }

    fn host(override_value: Option<u32>) -> HostRecord {
        HostRecord {
            name: "esx01".to_string(),
            id: "h1".to_string(),
            cluster_id: None,
            memory_gb: 64.0,
            sockets: 2,
            cores_per_socket: 4,
            hyperthreading_active: false,
            power_policy: PowerPolicy::Balanced,
            numa_vcpu_min_override: override_value,
        }
    }

    fn assess(vm: &VmRecord, host: &HostRecord, version: Option<u32>) -> ExposureAssessment {
        ExposureAssessment::assess(vm, host, version, VNUMA_MIN_HARDWARE_VERSION, DEFAULT_NUMA_VCPU_MIN)
    }

    #[test]
    fn test_parse_hardware_version() {
        assert_eq!(parse_hardware_version("vmx-13"), Some(13));
        assert_eq!(parse_hardware_version("VMX-07"), Some(7));
        assert_eq!(parse_hardware_version("vmx19"), Some(19));
        assert_eq!(parse_hardware_version("11"), Some(11));
        assert_eq!(parse_hardware_version("vmx-"), None);
        assert_eq!(parse_hardware_version("vmx--13"), None);
        assert_eq!(parse_hardware_version("vmx-+13"), None);
        assert_eq!(parse_hardware_version("+11"), None);
        assert_eq!(parse_hardware_version("vmx-1 3"), None);
        assert_eq!(parse_hardware_version("unknown"), None);
        assert_eq!(parse_hardware_version(""), None);
    }

    #[test]
    fn test_large_modern_vm_is_exposed() {
        let a = assess(&vm(12, false, None), &host(None), Some(14));
        assert!(a.checks.is_empty());
        assert!(a.exposed());
    }

    #[test]
    fn test_old_hardware_and_hot_add_block_exposure() {
        let a = assess(&vm(12, true, None), &host(None), Some(7));
        assert_eq!(
            a.checks,
            vec![
                ExposureCheck::OldHardware { version: Some(7), minimum: 8 },
                ExposureCheck::HotAddEnabled,
            ]
        );
        assert!(!a.exposed());
    }

    #[test]
    fn test_unknown_version_counts_as_old() {
        let a = assess(&vm(12, false, None), &host(None), None);
        assert_eq!(a.checks, vec![ExposureCheck::OldHardware { version: None, minimum: 8 }]);
    }

    #[test]
    fn test_small_vm_without_override() {
        let a = assess(&vm(6, false, None), &host(None), Some(14));
        assert_eq!(
            a.checks,
            vec![ExposureCheck::BelowDefaultThreshold { vcpus: 6, threshold: 9 }]
        );
        assert!(a.checks[0].message().contains("set numa.vcpu.min to 6 or lower"));
    }

    #[test]
    fn test_vm_override_takes_precedence() {
        // Host override is too high, VM override is low enough
        let a = assess(&vm(6, false, Some(4)), &host(Some(12)), Some(14));
        assert_eq!(
            a.checks,
            vec![ExposureCheck::ExposedByOverride { value: 4, source: OverrideSource::Vm }]
        );
        assert!(a.exposed());
    }

    #[test]
    fn test_host_override_used_when_vm_unset() {
        let a = assess(&vm(6, false, None), &host(Some(8)), Some(14));
        assert_eq!(
            a.checks,
            vec![ExposureCheck::OverrideTooHigh {
                value: 8,
                source: OverrideSource::Host,
                vcpus: 6
            }]
        );
        assert!(!a.exposed());
    }
}
