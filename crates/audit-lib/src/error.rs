//! Error types for the audit engine

use thiserror::Error;

/// Errors and warnings raised while auditing a single VM
///
/// None of these abort a batch: `HostNotFound` and `InvalidTopology` exclude
/// the VM from results, the rest degrade to a warning.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuditError {
    /// VM references a host absent from the host table
    #[error("host '{host_id}' referenced by VM '{vm}' was not found")]
    HostNotFound { vm: String, host_id: String },

    /// Host references a cluster absent from the cluster table
    #[error("cluster '{cluster_id}' referenced by host '{host}' was not found, treating host as unclustered")]
    ClusterNotFound { host: String, cluster_id: String },

    /// Hardware version identifier could not be parsed
    #[error("malformed hardware version '{identifier}' on VM '{vm}', assuming it is below the vNUMA threshold")]
    MalformedVersionIdentifier { vm: String, identifier: String },

    /// Topology values that cannot describe a real VM or host
    #[error("invalid topology for VM '{vm}': {reason}")]
    InvalidTopology { vm: String, reason: String },

    /// Inventory could not be acquired or parsed
    #[error("inventory error: {0}")]
    Inventory(String),
}

impl AuditError {
    /// Whether the VM can still be reported despite this error
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            AuditError::ClusterNotFound { .. } | AuditError::MalformedVersionIdentifier { .. }
        )
    }
}
