use std::collections::HashMap;

use anyhow::{anyhow, Result};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://greenledger.db?mode=rwc";
pub const DEFAULT_DELETE_CHUNK_SIZE: usize = 100;
pub const DEFAULT_MAX_HIERARCHY_DEPTH: usize = 64;
pub const DEFAULT_PROGRESS_KEY_PREFIX: &str = "org-delete";

/// Runtime settings loaded from `GREENLEDGER_*` environment variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    pub database_url: String,
    /// Rows per bulk-delete chunk unit
    pub delete_chunk_size: usize,
    /// Upper bound on entity ancestor walks
    pub max_hierarchy_depth: usize,
    pub progress_key_prefix: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            delete_chunk_size: DEFAULT_DELETE_CHUNK_SIZE,
            max_hierarchy_depth: DEFAULT_MAX_HIERARCHY_DEPTH,
            progress_key_prefix: DEFAULT_PROGRESS_KEY_PREFIX.to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self> {
        let mut values = HashMap::new();
        for key in Self::tracked_keys() {
            if let Ok(value) = std::env::var(key) {
                values.insert(key.to_string(), value);
            }
        }
        Self::from_map(&values)
    }

    pub fn from_map(values: &HashMap<String, String>) -> Result<Self> {
        fn read<'a>(values: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
            values
                .get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        }

        fn parse_usize(values: &HashMap<String, String>, key: &str, default: usize) -> Result<usize> {
            match read(values, key) {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| anyhow!("{} must be a non-negative integer, got '{}'", key, raw)),
                None => Ok(default),
            }
        }

        let delete_chunk_size = parse_usize(
            values,
            "GREENLEDGER_DELETE_CHUNK_SIZE",
            DEFAULT_DELETE_CHUNK_SIZE,
        )?;
        if delete_chunk_size == 0 {
            return Err(anyhow!("GREENLEDGER_DELETE_CHUNK_SIZE must be at least 1"));
        }

        let max_hierarchy_depth = parse_usize(
            values,
            "GREENLEDGER_MAX_HIERARCHY_DEPTH",
            DEFAULT_MAX_HIERARCHY_DEPTH,
        )?;

        Ok(Self {
            database_url: read(values, "GREENLEDGER_DATABASE_URL")
                .unwrap_or(DEFAULT_DATABASE_URL)
                .to_string(),
            delete_chunk_size,
            max_hierarchy_depth,
            progress_key_prefix: read(values, "GREENLEDGER_PROGRESS_KEY_PREFIX")
                .unwrap_or(DEFAULT_PROGRESS_KEY_PREFIX)
                .to_string(),
        })
    }

    fn tracked_keys() -> [&'static str; 4] {
        [
            "GREENLEDGER_DATABASE_URL",
            "GREENLEDGER_DELETE_CHUNK_SIZE",
            "GREENLEDGER_MAX_HIERARCHY_DEPTH",
            "GREENLEDGER_PROGRESS_KEY_PREFIX",
        ]
    }

    pub fn with_delete_chunk_size(mut self, chunk_size: usize) -> Self {
        self.delete_chunk_size = chunk_size.max(1);
        self
    }

    /// Progress-store key for the bulk delete of one organization
    pub fn progress_key(&self, organization_id: i32) -> String {
        format!("{}:{}", self.progress_key_prefix, organization_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = LedgerConfig::from_map(&HashMap::new()).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.progress_key(4), "org-delete:4");
    }

    #[test]
    fn test_reads_overrides() {
        let config = LedgerConfig::from_map(&map(&[
            ("GREENLEDGER_DATABASE_URL", "sqlite::memory:"),
            ("GREENLEDGER_DELETE_CHUNK_SIZE", "25"),
            ("GREENLEDGER_MAX_HIERARCHY_DEPTH", "8"),
            ("GREENLEDGER_PROGRESS_KEY_PREFIX", "purge"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.delete_chunk_size, 25);
        assert_eq!(config.max_hierarchy_depth, 8);
        assert_eq!(config.progress_key(1), "purge:1");
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let err = LedgerConfig::from_map(&map(&[("GREENLEDGER_DELETE_CHUNK_SIZE", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("at least 1"));

        assert!(LedgerConfig::from_map(&map(&[("GREENLEDGER_DELETE_CHUNK_SIZE", "lots")])).is_err());
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config =
            LedgerConfig::from_map(&map(&[("GREENLEDGER_DATABASE_URL", "  ")])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    }
}
