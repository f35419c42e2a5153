// Sizing: peak demand + headroom matched against the compute and storage catalogs.
// Storage tries one unit first, then the smallest stripe set (fewest units, then lowest
// tier), then falls back to a custom-provisioned volume.

use crate::config::SizingConfig;
use crate::error::SizingError;
use crate::models::{
    Catalog, ComputeTier, CustomStoragePricing, OverallStats, SizingRecommendation,
    SizingRequirements, StorageConfig, StorageLayout, StorageTier,
};

/// Absorbs float noise before rounding up (10.0 * 1.2 must give 12, not 13).
const CEIL_EPSILON: f64 = 1e-9;

const CUSTOM_STORAGE_SKU: &str = "custom-provisioned";

#[derive(Debug, Clone, Copy)]
pub struct SizingPolicy {
    pub headroom: f64,
    pub min_vcpus: u32,
    pub min_memory_gb: u64,
    pub max_stripe_units: u32,
}

impl Default for SizingPolicy {
    fn default() -> Self {
        Self::from(&SizingConfig::default())
    }
}

impl From<&SizingConfig> for SizingPolicy {
    fn from(c: &SizingConfig) -> Self {
        Self {
            headroom: c.headroom,
            min_vcpus: c.min_vcpus,
            min_memory_gb: c.min_memory_gb,
            max_stripe_units: c.max_stripe_units,
        }
    }
}

fn ceil_u64(x: f64) -> u64 {
    if !x.is_finite() || x <= 0.0 {
        return 0;
    }
    (x - CEIL_EPSILON).ceil().max(0.0) as u64
}

/// Peak demand with headroom, rounded up to catalog units.
pub fn requirements(overall: &OverallStats, policy: &SizingPolicy) -> SizingRequirements {
    let cpus = ceil_u64(overall.cpu_cores.max * policy.headroom);
    let memory_gb = ceil_u64(overall.memory_mb.max / 1024.0 * policy.headroom);
    SizingRequirements {
        cpus: (cpus.min(u32::MAX as u64) as u32).max(policy.min_vcpus),
        memory_gb: memory_gb.max(policy.min_memory_gb),
        iops: ceil_u64(overall.peak_total_iops * policy.headroom),
        throughput_mbps: ceil_u64(overall.peak_throughput_mbps * policy.headroom),
        capacity_gb: ceil_u64(overall.max_data_size_mb / 1024.0 * policy.headroom),
    }
}

pub fn recommend(
    overall: &OverallStats,
    catalog: &Catalog,
    policy: &SizingPolicy,
) -> Result<SizingRecommendation, SizingError> {
    let req = requirements(overall, policy);
    let (compute, meets) = select_compute(&catalog.compute, req.cpus, req.memory_gb)
        .ok_or(SizingError::EmptyComputeCatalog)?;
    let storage = select_storage(
        &catalog.storage,
        &req,
        policy.max_stripe_units,
        catalog.custom_storage.as_ref(),
    );

    let mut basis = vec![
        format!("catalog {}", catalog.version),
        format!(
            "peak CPU {:.2} cores x {:.2} headroom -> {} vCPUs (minimum {})",
            overall.cpu_cores.max, policy.headroom, req.cpus, policy.min_vcpus
        ),
        format!(
            "peak memory {:.0} MB x {:.2} headroom -> {} GB (minimum {})",
            overall.memory_mb.max, policy.headroom, req.memory_gb, policy.min_memory_gb
        ),
        format!(
            "peak I/O {:.0} IOPS, {:.1} MB/s, data {:.0} MB -> {} IOPS, {} MB/s, {} GB",
            overall.peak_total_iops,
            overall.peak_throughput_mbps,
            overall.max_data_size_mb,
            req.iops,
            req.throughput_mbps,
            req.capacity_gb
        ),
    ];
    if !meets {
        basis.push(format!(
            "no compute tier meets {} vCPUs / {} GB; using largest tier {}",
            req.cpus, req.memory_gb, compute.sku
        ));
    }
    match storage.layout {
        StorageLayout::Single => {
            basis.push(format!("single {} meets storage demand", storage.sku));
        }
        StorageLayout::Striped => basis.push(format!(
            "no single storage tier meets demand; striping {} x {}",
            storage.unit_count, storage.sku
        )),
        StorageLayout::Custom => {
            basis.push(format!(
                "no layout within {} striped units meets demand; custom-provisioned volume",
                policy.max_stripe_units
            ));
            if catalog.custom_storage.is_none() {
                basis.push("custom storage pricing not in catalog; storage cost shown as 0".into());
            }
        }
    }

    let total_monthly_cost = compute.monthly_cost + storage.monthly_cost;
    Ok(SizingRecommendation {
        compute_sku: compute.sku.clone(),
        vcpus: compute.vcpus,
        memory_gb: compute.memory_gb,
        compute_monthly_cost: compute.monthly_cost,
        compute_meets_requirements: meets,
        storage_config: storage,
        total_monthly_cost,
        requirements: req,
        basis,
    })
}

/// First tier (by vCPUs, then memory) covering both requirements, or the largest tier
/// with `false` when none does. `None` only for an empty catalog.
pub fn select_compute(
    compute: &[ComputeTier],
    cpus: u32,
    memory_gb: u64,
) -> Option<(&ComputeTier, bool)> {
    let mut sorted: Vec<&ComputeTier> = compute.iter().collect();
    sorted.sort_by(|a, b| {
        a.vcpus
            .cmp(&b.vcpus)
            .then(a.memory_gb.total_cmp(&b.memory_gb))
    });
    if let Some(tier) = sorted
        .iter()
        .find(|t| t.vcpus >= cpus && t.memory_gb >= memory_gb as f64)
    {
        return Some((*tier, true));
    }
    sorted.last().map(|t| (*t, false))
}

fn storage_sorted(storage: &[StorageTier]) -> Vec<&StorageTier> {
    let mut sorted: Vec<&StorageTier> = storage.iter().collect();
    sorted.sort_by_key(|t| (t.capacity_gb, t.iops, t.throughput_mbps));
    sorted
}

fn satisfies(tier: &StorageTier, units: u64, req: &SizingRequirements) -> bool {
    tier.iops * units >= req.iops
        && tier.throughput_mbps * units >= req.throughput_mbps
        && tier.capacity_gb * units >= req.capacity_gb
}

fn layout_of(tier: &StorageTier, units: u32) -> StorageConfig {
    let n = units as u64;
    StorageConfig {
        layout: if units > 1 {
            StorageLayout::Striped
        } else {
            StorageLayout::Single
        },
        is_striped: units > 1,
        sku: tier.sku.clone(),
        unit_count: units,
        total_iops: tier.iops * n,
        total_throughput: tier.throughput_mbps * n,
        total_capacity_gb: tier.capacity_gb * n,
        monthly_cost: tier.monthly_cost * units as f64,
    }
}

/// Smallest-capacity single tier meeting IOPS, throughput and capacity.
pub fn find_single(storage: &[StorageTier], req: &SizingRequirements) -> Option<StorageConfig> {
    storage_sorted(storage)
        .into_iter()
        .find(|t| satisfies(t, 1, req))
        .map(|t| layout_of(t, 1))
}

/// Stripe search: unit counts 2..=max_units, and for each count the tiers ascending by
/// capacity. The first pair meeting all three constraints wins, so no pair with fewer
/// units, or the same units and a lower tier, also qualifies.
pub fn find_striped(
    storage: &[StorageTier],
    req: &SizingRequirements,
    max_units: u32,
) -> Option<StorageConfig> {
    let sorted = storage_sorted(storage);
    (2..=max_units).find_map(|units| {
        sorted
            .iter()
            .find(|t| satisfies(t, units as u64, req))
            .map(|t| layout_of(t, units))
    })
}

/// Volume provisioned to exactly the requirements, priced linearly when pricing is known.
pub fn custom_storage(
    req: &SizingRequirements,
    pricing: Option<&CustomStoragePricing>,
) -> StorageConfig {
    let monthly_cost = pricing.map_or(0.0, |p| {
        req.capacity_gb as f64 * p.cost_per_gb_month
            + req.iops as f64 * p.cost_per_iops_month
            + req.throughput_mbps as f64 * p.cost_per_mbps_month
    });
    StorageConfig {
        layout: StorageLayout::Custom,
        is_striped: false,
        sku: pricing.map_or_else(|| CUSTOM_STORAGE_SKU.to_string(), |p| p.sku.clone()),
        unit_count: 1,
        total_iops: req.iops,
        total_throughput: req.throughput_mbps,
        total_capacity_gb: req.capacity_gb,
        monthly_cost,
    }
}

pub fn select_storage(
    storage: &[StorageTier],
    req: &SizingRequirements,
    max_units: u32,
    custom: Option<&CustomStoragePricing>,
) -> StorageConfig {
    find_single(storage, req)
        .or_else(|| find_striped(storage, req, max_units))
        .unwrap_or_else(|| custom_storage(req, custom))
}
