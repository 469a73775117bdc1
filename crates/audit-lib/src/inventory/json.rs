//! JSON inventory files
//!
//! Reads an inventory export of the form
//! `{ "source": ..., "vms": [...], "hosts": [...], "clusters": [...] }`.

use super::{async_trait, InventoryProvider};
use crate::error::AuditError;
use crate::models::Inventory;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Inventory stored in a JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonInventoryFile {
    path: PathBuf,
}

impl JsonInventoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse an inventory document
    pub fn parse(content: &str) -> Result<Inventory, AuditError> {
        serde_json::from_str(content).map_err(|e| AuditError::Inventory(e.to_string()))
    }
}

#[async_trait]
impl InventoryProvider for JsonInventoryFile {
    async fn fetch(&self) -> Result<Inventory> {
        debug!(path = %self.path.display(), "Reading inventory file");

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read inventory file {}", self.path.display()))?;

        let inventory = Self::parse(&content)
            .with_context(|| format!("Failed to parse inventory file {}", self.path.display()))?;

        info!(
            path = %self.path.display(),
            vms = inventory.vms.len(),
            hosts = inventory.hosts.len(),
            clusters = inventory.clusters.len(),
            "Loaded inventory"
        );

        Ok(inventory)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
