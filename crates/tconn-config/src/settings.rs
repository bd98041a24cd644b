//! Typed view over the merged config document.
//!
//! Every section is optional; absent keys take the defaults below.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_DATABASE_URL_ENV: &str = "TCONN_DATABASE_URL";
pub const DEFAULT_BROKER_HOST_SUFFIX: &str = ".diditaxi.com";
pub const DEFAULT_RESOLVER_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_MAX_DISTINCT_ADDRESSES: usize = 256;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8899";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSettings {
    /// NAME of the env var holding the Postgres URL.
    pub url_env: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url_env: DEFAULT_DATABASE_URL_ENV.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverSettings {
    pub broker_host_suffix: String,
    /// Per-lookup deadline.
    pub timeout_ms: u64,
    /// Distinct addresses looked up per query; the rest keep their raw address.
    pub max_distinct_addresses: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            broker_host_suffix: DEFAULT_BROKER_HOST_SUFFIX.to_string(),
            timeout_ms: DEFAULT_RESOLVER_TIMEOUT_MS,
            max_distinct_addresses: DEFAULT_MAX_DISTINCT_ADDRESSES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonSettings {
    pub bind_addr: String,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionsConfig {
    pub database: DatabaseSettings,
    pub resolver: ResolverSettings,
    /// cluster id → broker hostnames and IPs.
    pub brokers: BTreeMap<String, Vec<String>>,
    pub daemon: DaemonSettings,
}

impl ConnectionsConfig {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        serde_json::from_value(config_json.clone()).context("config does not match schema")
    }

    /// Broker lists keyed by numeric cluster id.
    pub fn broker_sets(&self) -> Result<BTreeMap<i64, Vec<String>>> {
        self.brokers
            .iter()
            .map(|(k, hosts)| {
                let id = k
                    .trim()
                    .parse::<i64>()
                    .with_context(|| format!("brokers: cluster id '{k}' is not an integer"))?;
                Ok((id, hosts.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_layered_yaml_from_strings;

    #[test]
    fn empty_document_yields_defaults() {
        let loaded = load_layered_yaml_from_strings(&[""]).unwrap();
        let cfg = loaded.settings().unwrap();
        assert_eq!(cfg, ConnectionsConfig::default());
        assert_eq!(cfg.resolver.timeout_ms, 500);
        assert_eq!(cfg.database.url_env, "TCONN_DATABASE_URL");
    }

    #[test]
    fn integer_cluster_keys_are_read() {
        let yaml = r#"
brokers:
  1: ["kafka-b1", "10.0.0.5"]
  "22": ["kafka-b22"]
"#;
        let cfg = load_layered_yaml_from_strings(&[yaml])
            .unwrap()
            .settings()
            .unwrap();
        let sets = cfg.broker_sets().unwrap();
        assert_eq!(sets[&1], vec!["kafka-b1".to_string(), "10.0.0.5".to_string()]);
        assert_eq!(sets[&22], vec!["kafka-b22".to_string()]);
    }

    #[test]
    fn non_numeric_cluster_key_is_rejected() {
        let yaml = "brokers:\n  primary: [\"kafka-b1\"]\n";
        let cfg = load_layered_yaml_from_strings(&[yaml])
            .unwrap()
            .settings()
            .unwrap();
        let err = cfg.broker_sets().unwrap_err().to_string();
        assert!(err.contains("primary"), "got: {err}");
    }

    #[test]
    fn typo_in_resolver_section_is_an_error() {
        let yaml = "resolver:\n  timeout_msec: 10\n";
        let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
        assert!(loaded.settings().is_err());
    }
}
