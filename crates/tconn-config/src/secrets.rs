//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES (e.g. `database.url_env:
//! "TCONN_DATABASE_URL"`). Binaries call [`resolve_database_url`] once at
//! startup and pass the value into constructors. Error messages name the
//! variable, never its value.

use anyhow::{bail, Result};

use crate::ConnectionsConfig;

/// Database URL resolved from the environment. Redacted in `Debug`.
#[derive(Clone)]
pub struct DatabaseUrl(String);

impl DatabaseUrl {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for DatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DatabaseUrl(<REDACTED>)")
    }
}

/// Returns `None` if the variable is unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Optional lookup: `None` when the configured variable is absent.
pub fn database_url(cfg: &ConnectionsConfig) -> Option<DatabaseUrl> {
    resolve_env(cfg.database.url_env.trim()).map(DatabaseUrl)
}

/// Required lookup.
///
/// # Errors
/// `SECRETS_MISSING` naming the env var when it is unset or empty.
pub fn resolve_database_url(cfg: &ConnectionsConfig) -> Result<DatabaseUrl> {
    match database_url(cfg) {
        Some(url) => Ok(url),
        None => bail!(
            "SECRETS_MISSING: required env var '{}' (database url) is not set or empty",
            cfg.database.url_env.trim()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let url = DatabaseUrl("postgres://u:p@h/db".to_string());
        assert_eq!(format!("{url:?}"), "DatabaseUrl(<REDACTED>)");
    }

    #[test]
    fn missing_variable_is_named_in_error() {
        let mut cfg = ConnectionsConfig::default();
        cfg.database.url_env = "TCONN_TEST_SURELY_UNSET_4F1C".to_string();
        let err = resolve_database_url(&cfg).unwrap_err().to_string();
        assert!(err.contains("SECRETS_MISSING"));
        assert!(err.contains("TCONN_TEST_SURELY_UNSET_4F1C"));
    }
}
