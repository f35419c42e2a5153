// Shared test helpers
#![allow(dead_code)]

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use workload_sizer::models::*;
use workload_sizer::source::SampleSource;

pub const CATALOG: &str = r#"
version = "2025-11"

[[compute]]
sku = "D4"
vcpus = 4
memory_gb = 16
monthly_cost = 280.0

[[compute]]
sku = "D8"
vcpus = 8
memory_gb = 32
monthly_cost = 560.0

[[compute]]
sku = "D16"
vcpus = 16
memory_gb = 64
monthly_cost = 1120.0

[[compute]]
sku = "D32"
vcpus = 32
memory_gb = 128
monthly_cost = 2240.0

[[storage]]
sku = "P10"
capacity_gb = 128
iops = 500
throughput_mbps = 100
monthly_cost = 19.7

[[storage]]
sku = "P20"
capacity_gb = 512
iops = 2300
throughput_mbps = 150
monthly_cost = 73.2

[[storage]]
sku = "P30"
capacity_gb = 1024
iops = 5000
throughput_mbps = 200
monthly_cost = 135.2

[[storage]]
sku = "P40"
capacity_gb = 2048
iops = 7500
throughput_mbps = 250
monthly_cost = 259.3
"#;

pub fn catalog() -> Catalog {
    Catalog::load_from_str(CATALOG).expect("test catalog")
}

pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 26)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

pub fn at(minutes: i64) -> NaiveDateTime {
    base_time() + TimeDelta::minutes(minutes)
}

/// Sample with every counter zeroed except the ones given.
pub fn sample(timestamp: NaiveDateTime, cpu_cores: Option<f64>, memory_mb: f64) -> Sample {
    Sample {
        timestamp,
        total_cpus: 8,
        used_cpu_cores: cpu_cores,
        cpu_time_ms: 0,
        committed_memory_mb: memory_mb,
        buffer_pool_mb: memory_mb / 2.0,
        batch_requests_per_sec: 100.0,
        compilations_per_sec: 5.0,
        user_connections: 20,
        total_reads: 0,
        total_writes: 0,
        read_stall_ms: 0,
        write_stall_ms: 0,
        total_bytes_read: 0,
        total_bytes_written: 0,
        data_size_mb: 0.0,
        top_wait_type: "CXPACKET".into(),
        top_wait_time_ms: 10,
    }
}

pub fn sample_with_io(timestamp: NaiveDateTime, reads: u64, writes: u64) -> Sample {
    Sample {
        total_reads: reads,
        total_writes: writes,
        ..sample(timestamp, Some(1.0), 4096.0)
    }
}

/// Counter row for tick `index` of a run sampled every `interval_secs`.
/// Four CPUs kept at 50% busy (two cores), 10 reads/s and 5 writes/s.
pub fn row(index: u64, interval_secs: u64) -> RawCounterRow {
    let elapsed = (index * interval_secs) as i64;
    RawCounterRow {
        sample_time: Some(base_time() + TimeDelta::seconds(elapsed)),
        total_cpus: 4,
        cpu_time_ms: 1_000_000 + index * interval_secs * 2_000,
        total_memory_mb: 32_768.0,
        committed_memory_mb: 12_288.0 + index as f64,
        target_memory_mb: 16_384.0,
        buffer_pool_mb: 8_192.0,
        batch_requests_per_sec: 250.0,
        compilations_per_sec: 12.0,
        user_connections: 40,
        total_reads: 50_000 + index * interval_secs * 10,
        total_writes: 20_000 + index * interval_secs * 5,
        total_read_latency_ms: 1_000,
        total_write_latency_ms: 500,
        total_bytes_read: index * interval_secs * 1024 * 1024,
        total_bytes_written: 0,
        data_size_mb: Some(102_400.0),
        top_wait_type: Some("PAGEIOLATCH_SH".into()),
        top_wait_time_ms: 42,
    }
}

/// Scripted source: fetch `i` yields `row(i)`, except fetches listed in `fail_at` (error)
/// and `stall_at` (sleeps `stall_secs` before answering). `resume_at` rewinds to a fetch
/// index, so a pre-flight fetch is repeated by the first tick.
pub struct FakeSource {
    pub interval_secs: u64,
    pub next: u64,
    pub fail_at: HashSet<u64>,
    pub stall_at: HashSet<u64>,
    pub stall_secs: u64,
    pub calls: u64,
}

impl FakeSource {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            interval_secs,
            next: 0,
            fail_at: HashSet::new(),
            stall_at: HashSet::new(),
            stall_secs: 0,
            calls: 0,
        }
    }

    pub fn failing_at(mut self, ticks: &[u64]) -> Self {
        self.fail_at.extend(ticks);
        self
    }

    pub fn stalling_at(mut self, ticks: &[u64], secs: u64) -> Self {
        self.stall_at.extend(ticks);
        self.stall_secs = secs;
        self
    }
}

impl SampleSource for FakeSource {
    async fn fetch(&mut self) -> anyhow::Result<RawCounterRow> {
        let index = self.next;
        self.next += 1;
        self.calls += 1;
        if self.stall_at.contains(&index) {
            tokio::time::sleep(std::time::Duration::from_secs(self.stall_secs)).await;
        }
        if self.fail_at.contains(&index) {
            anyhow::bail!("connection reset at tick {}", index);
        }
        Ok(row(index, self.interval_secs))
    }

    fn resume_at(&mut self, consumed: u64) {
        self.next = consumed;
    }
}

/// Config for a run writing into `dir`.
pub fn config_toml(dir: &std::path::Path, duration_minutes: u64, interval_seconds: u64) -> String {
    let dir = dir.display();
    format!(
        r#"
[run]
server = "sql-prod-01"
duration_minutes = {duration_minutes}
interval_seconds = {interval_seconds}
output_path = "{dir}/results.json"

[source]
kind = "replay"
path = "{dir}/rows.jsonl"

[sizing]
catalog_path = "{dir}/catalog.toml"
"#
    )
}
