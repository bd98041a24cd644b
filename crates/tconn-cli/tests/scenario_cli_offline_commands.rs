// CLI paths that never reach the database: config hashing, argument and
// input validation, missing secrets.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("tconn-cli")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("connections"))
        .stdout(predicate::str::contains("ingest"))
        .stdout(predicate::str::contains("config-hash"));
}

#[test]
fn config_hash_is_stable_across_key_order() {
    let a = write_temp("resolver:\n  timeout_ms: 250\n  broker_host_suffix: \".example.com\"\n");
    let b = write_temp("resolver:\n  broker_host_suffix: \".example.com\"\n  timeout_ms: 250\n");

    let hash_of = |path: &std::path::Path| -> String {
        let out = Command::cargo_bin("tconn-cli")
            .unwrap()
            .arg("config-hash")
            .arg(path)
            .output()
            .unwrap();
        assert!(out.status.success());
        String::from_utf8(out.stdout)
            .unwrap()
            .lines()
            .next()
            .unwrap()
            .to_string()
    };

    let ha = hash_of(a.path());
    assert!(ha.starts_with("config_hash="));
    assert_eq!(ha, hash_of(b.path()));
}

#[test]
fn config_hash_refuses_literal_database_url() {
    let f = write_temp("database:\n  url_env: \"postgres://admin:hunter2@db/tconn\"\n");

    Command::cargo_bin("tconn-cli")
        .unwrap()
        .arg("config-hash")
        .arg(f.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"));
}

#[test]
fn inverted_window_fails_before_connecting() {
    Command::cargo_bin("tconn-cli")
        .unwrap()
        .args([
            "connections",
            "topic",
            "--cluster",
            "1",
            "--topic",
            "orders",
            "--start-ms",
            "2000",
            "--end-ms",
            "1000",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is after --end-ms"));
}

#[test]
fn ingest_rejects_malformed_file() {
    let f = write_temp("{\"not\": \"an array\"}");

    Command::cargo_bin("tconn-cli")
        .unwrap()
        .args(["ingest", "--file"])
        .arg(f.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON array"));
}

#[test]
fn ingest_without_database_url_names_the_variable() {
    let f = write_temp("[]");
    let cfg = write_temp("database:\n  url_env: TCONN_CLI_TEST_UNSET_DB_URL\n");

    Command::cargo_bin("tconn-cli")
        .unwrap()
        .env_remove("TCONN_CLI_TEST_UNSET_DB_URL")
        .args(["ingest", "--file"])
        .arg(f.path())
        .arg("--config")
        .arg(cfg.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("SECRETS_MISSING"))
        .stderr(predicate::str::contains("TCONN_CLI_TEST_UNSET_DB_URL"));
}
