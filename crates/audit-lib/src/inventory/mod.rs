//! Inventory acquisition
//!
//! The audit engine never talks to a management plane itself. Providers
//! materialize the VM, host and cluster tables up front; the engine then
//! works on the in-memory [`Inventory`].

mod json;

pub use json::JsonInventoryFile;

use crate::models::Inventory;
use anyhow::Result;

pub use async_trait::async_trait;

/// Trait for inventory sources
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// Fetch the complete VM, host and cluster tables
    async fn fetch(&self) -> Result<Inventory>;

    /// Human-readable name of the source, used in logs
    fn describe(&self) -> String;
}

/// Provider over an already materialized inventory
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    inventory: Inventory,
}

impl StaticInventory {
    pub fn new(inventory: Inventory) -> Self {
        Self { inventory }
    }
}

#[async_trait]
impl InventoryProvider for StaticInventory {
    async fn fetch(&self) -> Result<Inventory> {
        Ok(self.inventory.clone())
    }

    fn describe(&self) -> String {
        self.inventory
            .source
            .clone()
            .unwrap_or_else(|| "in-memory inventory".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_inventory_returns_clone() {
        let inventory = Inventory {
            source: Some("vc-lab".to_string()),
            ..Inventory::default()
        };
        let provider = StaticInventory::new(inventory.clone());

        let fetched = tokio_test::block_on(provider.fetch()).unwrap();
        assert_eq!(fetched, inventory);
        assert_eq!(provider.describe(), "vc-lab");
    }
}
