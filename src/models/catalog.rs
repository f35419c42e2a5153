// Compute and storage catalogs (pricing/capacity tables), loaded from a versioned TOML file.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeTier {
    pub sku: String,
    pub vcpus: u32,
    pub memory_gb: f64,
    pub monthly_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageTier {
    pub sku: String,
    pub capacity_gb: u64,
    pub iops: u64,
    pub throughput_mbps: u64,
    pub monthly_cost: f64,
}

/// Linear pricing for a custom-provisioned volume (used when no catalog layout fits).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomStoragePricing {
    pub sku: String,
    pub cost_per_gb_month: f64,
    pub cost_per_iops_month: f64,
    pub cost_per_mbps_month: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Free-form catalog revision, copied into the recommendation basis.
    pub version: String,
    pub compute: Vec<ComputeTier>,
    pub storage: Vec<StorageTier>,
    #[serde(default)]
    pub custom_storage: Option<CustomStoragePricing>,
}

impl Catalog {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read catalog {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate a catalog from TOML.
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let catalog: Catalog = toml::from_str(s)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.version.is_empty(), "catalog.version must be non-empty");
        anyhow::ensure!(
            !self.compute.is_empty(),
            "catalog.compute must list at least one tier"
        );
        for c in &self.compute {
            anyhow::ensure!(
                c.vcpus > 0 && c.memory_gb > 0.0,
                "compute tier {} must have vcpus > 0 and memory_gb > 0",
                c.sku
            );
            anyhow::ensure!(
                c.monthly_cost >= 0.0,
                "compute tier {} has negative monthly_cost {}",
                c.sku,
                c.monthly_cost
            );
        }
        for s in &self.storage {
            anyhow::ensure!(
                s.capacity_gb > 0 && s.iops > 0 && s.throughput_mbps > 0,
                "storage tier {} must have capacity_gb, iops and throughput_mbps > 0",
                s.sku
            );
            anyhow::ensure!(
                s.monthly_cost >= 0.0,
                "storage tier {} has negative monthly_cost {}",
                s.sku,
                s.monthly_cost
            );
        }
        if let Some(custom) = &self.custom_storage {
            anyhow::ensure!(
                custom.cost_per_gb_month >= 0.0
                    && custom.cost_per_iops_month >= 0.0
                    && custom.cost_per_mbps_month >= 0.0,
                "custom_storage prices must be >= 0"
            );
        }
        Ok(())
    }
}
