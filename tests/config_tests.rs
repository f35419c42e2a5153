// Config loading and validation tests

use workload_sizer::config::{AppConfig, SourceConfig, sibling_path, total_samples};
use workload_sizer::models::CpuAccounting;

const VALID_CONFIG: &str = r#"
[run]
server = "sql-prod-01"
duration_minutes = 1440
interval_seconds = 60
output_path = "results/sql-prod-01.json"

[source]
kind = "command"
program = "sqlcmd-row"
args = ["--server", "sql-prod-01"]

[sizing]
catalog_path = "catalogs/default.toml"
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.run.server, "sql-prod-01");
    assert_eq!(config.run.duration_minutes, 1440);
    assert_eq!(config.run.interval_seconds, 60);
    assert_eq!(config.run.total_samples(), 1440);
    match &config.source {
        SourceConfig::Command { program, args } => {
            assert_eq!(program, "sqlcmd-row");
            assert_eq!(args, &["--server", "sql-prod-01"]);
        }
        other => panic!("expected command source, got {:?}", other),
    }
}

#[test]
fn test_config_defaults_when_omitted() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("valid");
    assert_eq!(config.run.checkpoint_interval_minutes, 60);
    assert_eq!(config.run.query_timeout_secs, 30);
    assert_eq!(config.run.cpu_accounting, CpuAccounting::Delta);
    assert!(config.run.resume_from.is_none());
    assert_eq!(config.sizing.headroom, 1.2);
    assert_eq!(config.sizing.min_vcpus, 4);
    assert_eq!(config.sizing.min_memory_gb, 8);
    assert_eq!(config.sizing.max_stripe_units, 8);
}

#[test]
fn test_config_derives_sibling_paths() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("valid");
    assert_eq!(
        config.run.checkpoint_path(),
        "results/sql-prod-01_checkpoint.json"
    );
    assert_eq!(config.run.summary_csv_path(), "results/sql-prod-01_summary.csv");

    let explicit = VALID_CONFIG.replace(
        "interval_seconds = 60",
        "interval_seconds = 60\ncheckpoint_path = \"/var/tmp/ck.json\"",
    );
    let config = AppConfig::load_from_str(&explicit).expect("valid");
    assert_eq!(config.run.checkpoint_path(), "/var/tmp/ck.json");
}

#[test]
fn test_sibling_path_without_json_extension() {
    assert_eq!(sibling_path("out", "_checkpoint.json"), "out_checkpoint.json");
}

#[test]
fn test_total_samples_is_floor_of_duration_over_interval() {
    for (d, i) in [(15, 60), (180, 60), (1, 7), (720, 45), (1440, 3600), (10, 601)] {
        assert_eq!(total_samples(d, i), d * 60 / i, "d={} i={}", d, i);
    }
    assert_eq!(total_samples(15, 0), 0);
    assert_eq!(total_samples(u64::MAX, 60), 0);
}

#[test]
fn test_config_validation_rejects_duration_overflowing_seconds() {
    let bad = VALID_CONFIG.replace(
        "duration_minutes = 1440",
        &format!("duration_minutes = {}", u64::MAX / 10),
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("too large"));
}

#[test]
fn test_config_replay_source() {
    let replay = VALID_CONFIG.replace(
        "kind = \"command\"\nprogram = \"sqlcmd-row\"\nargs = [\"--server\", \"sql-prod-01\"]",
        "kind = \"replay\"\npath = \"rows.jsonl\"",
    );
    let config = AppConfig::load_from_str(&replay).expect("valid");
    assert!(matches!(config.source, SourceConfig::Replay { ref path } if path == "rows.jsonl"));
}

#[test]
fn test_config_cumulative_accounting() {
    let legacy = VALID_CONFIG.replace(
        "interval_seconds = 60",
        "interval_seconds = 60\ncpu_accounting = \"cumulative\"",
    );
    let config = AppConfig::load_from_str(&legacy).expect("valid");
    assert_eq!(config.run.cpu_accounting, CpuAccounting::Cumulative);
}

#[test]
fn test_config_validation_rejects_duration_zero() {
    let bad = VALID_CONFIG.replace("duration_minutes = 1440", "duration_minutes = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("run.duration_minutes"));
}

#[test]
fn test_config_validation_rejects_interval_zero() {
    let bad = VALID_CONFIG.replace("interval_seconds = 60", "interval_seconds = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("run.interval_seconds"));
}

#[test]
fn test_config_validation_rejects_interval_longer_than_duration() {
    let bad = VALID_CONFIG
        .replace("duration_minutes = 1440", "duration_minutes = 1")
        .replace("interval_seconds = 60", "interval_seconds = 120");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("at least one"));
}

#[test]
fn test_config_validation_rejects_checkpoint_interval_zero() {
    let bad = VALID_CONFIG.replace(
        "interval_seconds = 60",
        "interval_seconds = 60\ncheckpoint_interval_minutes = 0",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("run.checkpoint_interval_minutes"));
}

#[test]
fn test_config_validation_rejects_empty_program() {
    let bad = VALID_CONFIG.replace("program = \"sqlcmd-row\"", "program = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("source.program"));
}

#[test]
fn test_config_validation_rejects_headroom_below_one() {
    let bad = VALID_CONFIG.replace(
        "catalog_path = \"catalogs/default.toml\"",
        "catalog_path = \"catalogs/default.toml\"\nheadroom = 0.8",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("sizing.headroom"));
}

#[test]
fn test_config_validation_rejects_single_stripe_unit() {
    let bad = VALID_CONFIG.replace(
        "catalog_path = \"catalogs/default.toml\"",
        "catalog_path = \"catalogs/default.toml\"\nmax_stripe_units = 1",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("sizing.max_stripe_units"));
}

#[test]
fn test_config_validation_rejects_unknown_source_kind() {
    let bad = VALID_CONFIG.replace("kind = \"command\"", "kind = \"odbc\"");
    assert!(AppConfig::load_from_str(&bad).is_err());
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_overrides_are_applied_and_validated() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("valid");
    let config = config
        .with_overrides(Some(15), Some(30), Some("ck.json".into()))
        .expect("overrides");
    assert_eq!(config.run.duration_minutes, 15);
    assert_eq!(config.run.interval_seconds, 30);
    assert_eq!(config.run.total_samples(), 30);
    assert_eq!(config.run.resume_from.as_deref(), Some("ck.json"));

    let err = config.with_overrides(None, Some(0), None).unwrap_err();
    assert!(err.to_string().contains("run.interval_seconds"));
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.run.server, "sql-prod-01");
    assert_eq!(config.sizing.catalog_path, "catalogs/default.toml");
}

#[test]
fn test_shipped_example_config_and_catalog_are_valid() {
    let example = concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.toml");
    let config = AppConfig::load_from_str(&std::fs::read_to_string(example).unwrap())
        .expect("example config");
    assert_eq!(config.run.checkpoint_interval_minutes, 60);

    let catalog = workload_sizer::models::Catalog::load(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/catalogs/default.toml"
    ))
    .expect("default catalog");
    assert!(!catalog.compute.is_empty());
    assert!(catalog.custom_storage.is_some());
}
