//! Benchmark configuration (`stmtbench.toml`).
//!
//! ```toml
//! [database]
//! url = "mysql://localhost:3306/sakila"
//! user = "root"
//! password = "1234"
//!
//! [benchmark]
//! iterations = 10000
//! cycle = 200
//! query = "actor-revenue"
//!
//! [[variants]]
//! name = "server-side + cache"
//! properties = "serverSidePrepare=true&clientCache=true&cacheSizeLimit=2048"
//! ```
//!
//! Every section is optional; missing values fall back to the defaults shown.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::driver::DEFAULT_CACHE_CAPACITY;
use crate::engine::{BenchmarkPlan, DEFAULT_CYCLE, DEFAULT_ITERATIONS};
use crate::error::{BenchError, BenchResult};
use crate::mysql::{Credentials, MySqlFactory};
use crate::query::{ParameterCycle, Query, QueryPreset};
use crate::variant::ConfigVariant;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "stmtbench.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub database: DatabaseConfig,
    pub benchmark: BenchmarkConfig,
    pub variants: Vec<VariantEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub user: String,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "mysql://localhost:3306/sakila".to_string(),
            user: "root".to_string(),
            password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub iterations: u32,
    pub cycle: u32,
    pub query: QueryPreset,
    /// Custom SQL; takes precedence over `query`.
    pub sql: Option<String>,
    pub cache_capacity: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            cycle: DEFAULT_CYCLE,
            query: QueryPreset::default(),
            sql: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantEntry {
    #[serde(default)]
    pub name: Option<String>,
    pub properties: String,
}

impl BenchConfig {
    pub fn from_toml(content: &str) -> BenchResult<Self> {
        toml::from_str(content).map_err(|e| BenchError::Config(e.to_string()))
    }

    /// Load from `path`, or from the first discovered config file, or defaults.
    ///
    /// Returns the path that was read, if any.
    pub fn load(path: Option<&Path>) -> BenchResult<(Self, Option<PathBuf>)> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::discover(),
        };

        match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    BenchError::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                let config = Self::from_toml(&content)?;
                tracing::info!("Loaded config from {}", path.display());
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// `./stmtbench.toml`, then `<config dir>/stmtbench/config.toml`.
    pub fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("stmtbench").join("config.toml"))
            .filter(|p| p.exists())
    }

    /// The configured variants, or the four presets when none are listed.
    pub fn variants(&self) -> BenchResult<Vec<ConfigVariant>> {
        if self.variants.is_empty() {
            return Ok(ConfigVariant::presets());
        }

        let mut seen = HashSet::new();
        let mut variants = Vec::with_capacity(self.variants.len());
        for entry in &self.variants {
            let variant = match &entry.name {
                Some(name) => ConfigVariant::from_properties(name.as_str(), &entry.properties)?,
                None => entry.properties.parse::<ConfigVariant>()?,
            };
            if !seen.insert(variant.name.clone()) {
                return Err(BenchError::Config(format!(
                    "Variant '{}' is listed more than once",
                    variant.name
                )));
            }
            variants.push(variant);
        }
        Ok(variants)
    }

    pub fn query(&self) -> BenchResult<Query> {
        match &self.benchmark.sql {
            Some(sql) => Query::new(sql),
            None => Query::preset(self.benchmark.query),
        }
    }

    pub fn plan(&self) -> BenchResult<BenchmarkPlan> {
        Ok(BenchmarkPlan::new(
            self.query()?,
            self.benchmark.iterations,
            ParameterCycle::new(self.benchmark.cycle)?,
        ))
    }

    pub fn factory(&self) -> MySqlFactory {
        MySqlFactory::new(
            self.database.url.clone(),
            Credentials {
                user: self.database.user.clone(),
                password: self.database.password.clone(),
            },
        )
        .with_cache_capacity(self.benchmark.cache_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_is_defaults() {
        assert_eq!(BenchConfig::from_toml("").unwrap(), BenchConfig::default());
    }

    #[test]
    fn test_defaults_cover_four_cases() {
        let config = BenchConfig::default();
        assert_eq!(config.benchmark.iterations, 10_000);
        assert_eq!(config.benchmark.cycle, 200);
        assert_eq!(config.variants().unwrap(), ConfigVariant::presets());
        assert!(config.plan().is_ok());
    }
}
