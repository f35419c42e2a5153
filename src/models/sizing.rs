// Sizing requirements and the final recommendation.

use serde::{Deserialize, Serialize};

/// Peak demand plus headroom, in catalog units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizingRequirements {
    pub cpus: u32,
    #[serde(rename = "memoryGB")]
    pub memory_gb: u64,
    pub iops: u64,
    #[serde(rename = "throughputMBps")]
    pub throughput_mbps: u64,
    #[serde(rename = "capacityGB")]
    pub capacity_gb: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLayout {
    Single,
    Striped,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    pub layout: StorageLayout,
    pub is_striped: bool,
    pub sku: String,
    pub unit_count: u32,
    #[serde(rename = "totalIOPS")]
    pub total_iops: u64,
    pub total_throughput: u64,
    #[serde(rename = "totalCapacityGB")]
    pub total_capacity_gb: u64,
    pub monthly_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizingRecommendation {
    pub compute_sku: String,
    #[serde(rename = "vCPUs")]
    pub vcpus: u32,
    #[serde(rename = "memoryGB")]
    pub memory_gb: f64,
    pub compute_monthly_cost: f64,
    /// False when the catalog's largest tier was chosen without meeting the requirements.
    pub compute_meets_requirements: bool,
    pub storage_config: StorageConfig,
    pub total_monthly_cost: f64,
    pub requirements: SizingRequirements,
    /// Human-readable explanation of how the tiers were chosen.
    pub basis: Vec<String>,
}
