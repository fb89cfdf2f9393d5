//! Runtime configuration
//!
//! Defaults, optionally overridden by a JSON file and then by environment
//! variables (`DATA_PATH`, `PORT`, `CACHE_TTL_SECS`, `CACHE_MAX_ENTRIES`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default dataset location, relative to the working directory
pub const DEFAULT_DATA_PATH: &str = "data/similaridade_sicar_sigef_brasil.csv";

/// One hour
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    /// Entry bound; unbounded when absent
    pub max_entries: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_entries: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_path: PathBuf,
    pub port: u16,
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            port: 3000,
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Load from a JSON file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config JSON: {:?}", path))?;

        Ok(config.with_overrides(|name| std::env::var(name).ok()))
    }

    /// Apply overrides from a variable lookup
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup("DATA_PATH").filter(|p| !p.trim().is_empty()) {
            self.data_path = PathBuf::from(path);
        }
        if let Some(port) = parse_var(&lookup, "PORT") {
            self.port = port;
        }
        if let Some(ttl) = parse_var(&lookup, "CACHE_TTL_SECS") {
            self.cache.ttl_secs = ttl;
        }
        if let Some(max) = parse_var(&lookup, "CACHE_MAX_ENTRIES") {
            self.cache.max_entries = Some(max);
        }
        self
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}", name, raw);
            None
        }
    }
}
