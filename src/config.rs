use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8081/api";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    /// No timeout unless configured.
    pub timeout: Option<Duration>,
    pub data_dir: PathBuf,
    pub log_filter: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = set("EMS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout = set("EMS_HTTP_TIMEOUT_SECS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("invalid EMS_HTTP_TIMEOUT_SECS: {}", raw))
            })
            .transpose()?
            .map(Duration::from_secs);

        let data_dir = set("EMS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let log_filter = set("RUST_LOG").unwrap_or_else(|| "warn".to_string());

        Ok(Self {
            api_url,
            timeout,
            data_dir,
            log_filter,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("ems.db")
    }
}

fn default_data_dir() -> PathBuf {
    // Use XDG data directory or fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "ems") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout, None);
        assert_eq!(config.log_filter, "warn");
        assert!(config.db_path().ends_with("ems.db"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("EMS_API_URL", "http://hr.internal/api"),
            ("EMS_HTTP_TIMEOUT_SECS", " 15 "),
            ("EMS_DATA_DIR", "/tmp/ems-test"),
            ("RUST_LOG", "ems=debug"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://hr.internal/api");
        assert_eq!(config.timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.db_path(), PathBuf::from("/tmp/ems-test/ems.db"));
        assert_eq!(config.log_filter, "ems=debug");
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = Config::from_lookup(lookup(&[("EMS_API_URL", "  ")])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        let err = Config::from_lookup(lookup(&[("EMS_HTTP_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("EMS_HTTP_TIMEOUT_SECS"));
    }
}
