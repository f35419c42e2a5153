// Sample derivation and serialization shape tests

mod common;

use common::{at, row, sample};
use workload_sizer::error::SampleError;
use workload_sizer::models::*;

#[test]
fn raw_row_parses_query_column_names() {
    let json = r#"{
        "SampleTime": "2025-11-26T09:15:00",
        "TotalCPUs": 8,
        "SQLServerCPUTimeMs": 123456,
        "CommittedMemoryMB": 20480.5,
        "BufferPoolMB": 16384,
        "BatchRequestsPerSec": 812.5,
        "CompilationsPerSec": 31.0,
        "UserConnections": 57,
        "TotalReads": 1000,
        "TotalWrites": 400,
        "TotalReadLatencyMs": 9000,
        "TotalWriteLatencyMs": 3000,
        "DataSizeMB": 51200,
        "TopWaitType": "PAGEIOLATCH_SH",
        "TopWaitTimeMs": 77
    }"#;
    let row: RawCounterRow = serde_json::from_str(json).expect("parse row");
    assert_eq!(row.total_cpus, 8);
    assert_eq!(row.cpu_time_ms, 123_456);
    assert_eq!(row.user_connections, 57);
    assert_eq!(row.data_size_mb, Some(51_200.0));
    assert_eq!(row.total_bytes_read, 0);
    assert_eq!(row.sample_time, Some(at(15)));
}

#[test]
fn first_sample_has_no_cpu_baseline() {
    let s = Sample::from_row(row(0, 60), at(0), None, 60, CpuAccounting::Delta).unwrap();
    assert_eq!(s.used_cpu_cores, None);
    assert_eq!(s.top_wait_type, "PAGEIOLATCH_SH");
    assert_eq!(s.read_stall_ms, 1_000);
}

#[test]
fn delta_cpu_uses_previous_sample() {
    let prev = Sample::from_row(row(0, 60), at(0), None, 60, CpuAccounting::Delta).unwrap();
    let s = Sample::from_row(row(1, 60), at(1), Some(&prev), 60, CpuAccounting::Delta).unwrap();
    // 120 000 ms over 60 s on 4 CPUs = 50% = 2 cores
    let cores = s.used_cpu_cores.expect("measured");
    assert!((cores - 2.0).abs() < 1e-9, "cores = {}", cores);
}

#[test]
fn delta_cpu_uses_actual_gap_between_samples() {
    let prev = Sample::from_row(row(0, 60), at(0), None, 60, CpuAccounting::Delta).unwrap();
    // Same counter advance spread over two minutes (one missed tick): one core.
    let s = Sample::from_row(row(1, 60), at(2), Some(&prev), 60, CpuAccounting::Delta).unwrap();
    assert!((s.used_cpu_cores.unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn cpu_counter_reset_is_unmeasured() {
    let prev = Sample::from_row(row(10, 60), at(10), None, 60, CpuAccounting::Delta).unwrap();
    let mut r = row(11, 60);
    r.cpu_time_ms = 5;
    let s = Sample::from_row(r, at(11), Some(&prev), 60, CpuAccounting::Delta).unwrap();
    assert_eq!(s.used_cpu_cores, None);
}

#[test]
fn cumulative_accounting_is_clamped_to_total_cpus() {
    // Whole since-startup counter over one interval: far above 100%, clamped.
    let s = Sample::from_row(row(5, 60), at(5), None, 60, CpuAccounting::Cumulative).unwrap();
    assert_eq!(s.used_cpu_cores, Some(4.0));
}

#[test]
fn cpu_percent_is_clamped() {
    assert_eq!(cpu_percent(0, 60.0, 4), 0.0);
    assert_eq!(cpu_percent(120_000, 60.0, 4), 50.0);
    assert_eq!(cpu_percent(10_000_000, 60.0, 4), 100.0);
    assert_eq!(cpu_percent(1_000, 0.0, 4), 0.0);
}

#[test]
fn invalid_rows_are_rejected() {
    let mut r = row(0, 60);
    r.total_cpus = 0;
    let err = Sample::from_row(r, at(0), None, 60, CpuAccounting::Delta).unwrap_err();
    assert!(matches!(err, SampleError::InvalidRow(_)));

    let mut r = row(0, 60);
    r.committed_memory_mb = f64::NAN;
    let err = Sample::from_row(r, at(0), None, 60, CpuAccounting::Delta).unwrap_err();
    assert!(err.to_string().contains("CommittedMemoryMB"));
}

#[test]
fn sample_serializes_with_result_field_names() {
    let s = sample(at(0), Some(1.5), 4096.0);
    let v = serde_json::to_value(&s).unwrap();
    for key in [
        "timestamp",
        "totalCPUs",
        "usedCPUCores",
        "committedMemoryMB",
        "bufferPoolMB",
        "batchRequestsPerSec",
        "compilationsPerSec",
        "userConnections",
        "totalReads",
        "totalWrites",
        "readStallMs",
        "writeStallMs",
        "topWaitType",
        "topWaitTimeMs",
    ] {
        assert!(v.get(key).is_some(), "missing {}", key);
    }
    let back: Sample = serde_json::from_value(v).unwrap();
    assert_eq!(back, s);
}

#[test]
fn unmeasured_bucket_rates_serialize_as_null() {
    let b = HourlyBucket {
        hour: at(0),
        sample_count: 1,
        avg_cpu_cores: 1.0,
        max_cpu_cores: 1.0,
        avg_memory_mb: 1.0,
        max_memory_mb: 1.0,
        avg_batch_req_per_sec: 1.0,
        max_batch_req_per_sec: 1.0,
        avg_connections: 1.0,
        max_connections: 1,
        read_iops: None,
        write_iops: None,
        total_iops: None,
        throughput_mbps: None,
    };
    let v = serde_json::to_value(&b).unwrap();
    assert!(v["readIOPS"].is_null());
    assert!(v["totalIOPS"].is_null());
    assert_eq!(v["maxCPUCores"], 1.0);
}

#[test]
fn progress_percent_caps_at_hundred() {
    assert_eq!(progress_percent(30, 720), 30.0 / 720.0 * 100.0);
    assert_eq!(progress_percent(720, 720), 100.0);
    assert_eq!(progress_percent(5, 0), 0.0);
}
