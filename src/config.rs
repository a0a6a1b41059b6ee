// src/config.rs
use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path};
use url::Url;

/// Connection settings for the ClickHouse HTTP interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickHouseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// `https` when true.
    pub secure: bool,
    pub database: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            host: "clickhouse".into(),
            port: 8123,
            username: "default".into(),
            password: String::new(),
            secure: false,
            database: None,
            timeout_secs: 60,
        }
    }
}

impl ClickHouseConfig {
    pub fn endpoint(&self) -> Result<Url> {
        let scheme = if self.secure { "https" } else { "http" };
        Url::parse(&format!("{}://{}:{}/", scheme, self.host, self.port))
            .map_err(|e| EtlError::Config(format!("bad ClickHouse endpoint: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub clickhouse: ClickHouseConfig,
    /// Target table for the load stage.
    pub table: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clickhouse: ClickHouseConfig::default(),
            table: "customers".into(),
        }
    }
}

impl Config {
    /// Defaults, then the YAML file named by `CUSTFLOW_CONFIG` (if set),
    /// then `CLICKHOUSE_*` / `CUSTFLOW_TABLE` environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var("CUSTFLOW_CONFIG") {
            Ok(path) => Self::from_yaml_file(path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .map_err(|e| EtlError::Config(format!("opening {}: {e}", path.display())))?;
        serde_yaml::from_reader(f)
            .map_err(|e| EtlError::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ch = &mut self.clickhouse;
        if let Some(v) = lookup("CLICKHOUSE_HOST") {
            ch.host = v;
        }
        if let Some(v) = lookup("CLICKHOUSE_PORT") {
            ch.port = v
                .parse()
                .map_err(|_| EtlError::Config(format!("CLICKHOUSE_PORT is not a port: {v:?}")))?;
        }
        if let Some(v) = lookup("CLICKHOUSE_USER") {
            ch.username = v;
        }
        if let Some(v) = lookup("CLICKHOUSE_PASSWORD") {
            ch.password = v;
        }
        if let Some(v) = lookup("CLICKHOUSE_SECURE") {
            ch.secure = match v.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(EtlError::Config(format!(
                        "CLICKHOUSE_SECURE is not a boolean: {v:?}"
                    )))
                }
            };
        }
        if let Some(v) = lookup("CLICKHOUSE_DATABASE") {
            ch.database = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = lookup("CUSTFLOW_TABLE") {
            self.table = v;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.table, "customers");
        assert_eq!(
            cfg.clickhouse.endpoint().unwrap().as_str(),
            "http://clickhouse:8123/"
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "table: customers_test\nclickhouse:\n  host: localhost\n  secure: true").unwrap();
        let cfg = Config::from_yaml_file(tmp.path()).unwrap();
        assert_eq!(cfg.table, "customers_test");
        assert_eq!(cfg.clickhouse.host, "localhost");
        assert_eq!(cfg.clickhouse.port, 8123);
        assert_eq!(cfg.clickhouse.username, "default");
        assert_eq!(
            cfg.clickhouse.endpoint().unwrap().as_str(),
            "https://localhost:8123/"
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CLICKHOUSE_HOST", "ch.internal"),
            ("CLICKHOUSE_PORT", "8443"),
            ("CLICKHOUSE_SECURE", "true"),
            ("CLICKHOUSE_DATABASE", "analytics"),
            ("CUSTFLOW_TABLE", "customers_v2"),
        ]
        .into_iter()
        .collect();

        let mut cfg = Config::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.clickhouse.host, "ch.internal");
        assert_eq!(cfg.clickhouse.port, 8443);
        assert!(cfg.clickhouse.secure);
        assert_eq!(cfg.clickhouse.database.as_deref(), Some("analytics"));
        assert_eq!(cfg.table, "customers_v2");
    }

    #[test]
    fn test_bad_env_port() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_env(|k| (k == "CLICKHOUSE_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }
}
