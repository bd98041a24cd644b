//! Unused-key guard.
//!
//! GREEN when:
//! 1) Unused keys are reported in WARN mode without error.
//! 2) Unused keys fail in FAIL mode.
//! 3) Keys under consumed prefixes are not flagged.
//! 4) The CLI registry does not consume daemon-only keys.

use tconn_config::{
    load_layered_yaml, load_layered_yaml_from_strings, report_unused_keys, ConfigMode,
    UnusedKeyPolicy,
};

const FULL_YAML: &str = r#"
database:
  url_env: "TCONN_DATABASE_URL"
resolver:
  broker_host_suffix: ".diditaxi.com"
  timeout_ms: 250
  max_distinct_addresses: 64
brokers:
  "1": ["kafka-b1", "10.0.0.5"]
  "2": ["kafka-b2"]
daemon:
  bind_addr: "0.0.0.0:8899"
"#;

#[test]
fn warn_mode_reports_unused_keys_without_error() {
    let yaml = format!("{FULL_YAML}\nlegacy:\n  zk_hosts: \"zk1:2181\"\n");
    let loaded = load_layered_yaml_from_strings(&[&yaml]).expect("config load must succeed");

    let report = report_unused_keys(ConfigMode::Daemon, &loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn mode must not error");

    assert!(!report.is_clean());
    assert_eq!(report.unused_leaf_pointers, vec!["/legacy/zk_hosts".to_string()]);
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let yaml = format!("{FULL_YAML}\nlegacy:\n  zk_hosts: \"zk1:2181\"\n");
    let loaded = load_layered_yaml_from_strings(&[&yaml]).expect("config load must succeed");

    let err = report_unused_keys(ConfigMode::Daemon, &loaded.config_json, UnusedKeyPolicy::Fail)
        .expect_err("fail mode must error")
        .to_string();
    assert!(err.contains("CONFIG_UNUSED_KEYS"), "got: {err}");
    assert!(err.contains("/legacy/zk_hosts"), "got: {err}");
}

#[test]
fn daemon_consumes_full_document() {
    let loaded = load_layered_yaml_from_strings(&[FULL_YAML]).expect("load");
    let report = report_unused_keys(ConfigMode::Daemon, &loaded.config_json, UnusedKeyPolicy::Fail)
        .expect("all keys consumed");
    assert!(report.is_clean());
}

#[test]
fn cli_does_not_consume_daemon_section() {
    let loaded = load_layered_yaml_from_strings(&[FULL_YAML]).expect("load");
    let report = report_unused_keys(ConfigMode::Cli, &loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn");
    assert_eq!(report.unused_leaf_pointers, vec!["/daemon/bind_addr".to_string()]);
}

#[test]
fn layered_files_load_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = dir.path().join("base.yaml");
    let local = dir.path().join("local.yaml");
    std::fs::write(&base, FULL_YAML).expect("write base");
    std::fs::write(&local, "resolver:\n  timeout_ms: 75\n").expect("write local");

    let base_s = base.to_string_lossy().to_string();
    let local_s = local.to_string_lossy().to_string();
    let loaded = load_layered_yaml(&[&base_s, &local_s]).expect("load from disk");
    assert_eq!(loaded.settings().expect("settings").resolver.timeout_ms, 75);

    let missing = dir.path().join("nope.yaml").to_string_lossy().to_string();
    let err = load_layered_yaml(&[&missing]).expect_err("missing file").to_string();
    assert!(err.contains("failed to read yaml path"), "got: {err}");
}
