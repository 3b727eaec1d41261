//! Configuration for tally.
//!
//! TOML-based configuration with global defaults and per-store overrides.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Global defaults applied to all stores unless overridden.
    pub defaults: GlobalDefaults,

    /// Per-store configuration overrides (keyed by store name).
    #[serde(default)]
    pub stores: HashMap<String, StoreConfig>,
}

/// Global default settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalDefaults {
    pub query: QueryConfig,
    pub pool: PoolConfig,
}

/// Defaults applied to every filter handed to the analyzer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Query timeout in milliseconds (0 = no timeout).
    pub timeout_ms: u64,
    /// Client used when the caller passes no filter.
    pub default_client_id: i64,
    /// IANA timezone name used when a filter has none.
    pub timezone: String,
    /// Cap for the time spent on a single page (0 = no cap).
    pub max_time_on_page_seconds: i64,
    /// Sampling size passed to every query (0 = no sampling).
    pub sample: u32,
}

/// Connection pooling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum pool size (default: 16).
    pub size: usize,
}

/// Per-store configuration (can override globals).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub query: Option<QueryConfig>,
    pub pool: Option<PoolConfig>,

    /// DuckDB-specific options.
    pub duckdb: Option<DuckDbConfig>,
}

/// DuckDB-specific configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DuckDbConfig {
    /// Maximum concurrent queries (default: 16).
    pub max_concurrency: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            default_client_id: 0,
            timezone: "UTC".to_string(),
            max_time_on_page_seconds: 0,
            sample: 0,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { size: 16 }
    }
}

impl Default for DuckDbConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
        }
    }
}

impl QueryConfig {
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| TallyError::Config(format!("invalid timezone {}: {e}", self.timezone)))
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

impl TallyConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| TallyError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(toml_str)
            .map_err(|e| TallyError::Config(format!("failed to parse config: {e}")))?;
        cfg.defaults.query.timezone()?;
        for query in cfg.stores.values().filter_map(|s| s.query.as_ref()) {
            query.timezone()?;
        }
        Ok(cfg)
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `TALLY_CONFIG` environment variable
    /// 2. `./tally.toml` (current directory)
    /// 3. `~/.config/tally/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("TALLY_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from TALLY_CONFIG");
                    return cfg;
                }
                Err(err) => tracing::debug!(path = %path, error = %err, "ignoring TALLY_CONFIG"),
            }
        }

        if let Ok(cfg) = Self::from_file("tally.toml") {
            tracing::info!("loaded config from ./tally.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tally").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }

    /// Get resolved config for a specific store (merges global defaults).
    pub fn for_store(&self, name: &str) -> ResolvedStoreConfig {
        ResolvedStoreConfig::merge(&self.defaults, self.stores.get(name))
    }
}

/// Fully resolved configuration for a store (no Option fields).
#[derive(Debug, Clone)]
pub struct ResolvedStoreConfig {
    pub query: QueryConfig,
    pub pool: PoolConfig,
    pub duckdb: DuckDbConfig,
}

impl ResolvedStoreConfig {
    fn merge(defaults: &GlobalDefaults, override_cfg: Option<&StoreConfig>) -> Self {
        match override_cfg {
            Some(store) => Self {
                query: store.query.clone().unwrap_or_else(|| defaults.query.clone()),
                pool: store.pool.clone().unwrap_or_else(|| defaults.pool.clone()),
                duckdb: store.duckdb.clone().unwrap_or_default(),
            },
            None => Self {
                query: defaults.query.clone(),
                pool: defaults.pool.clone(),
                duckdb: DuckDbConfig::default(),
            },
        }
    }
}
