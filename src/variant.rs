//! Benchmark configuration variants.
//!
//! A variant is the set of driver toggles a single run is measured under.
//! Variants are written as connection-string style properties:
//!
//! | Key                 | Alias                   | Meaning                              |
//! |---------------------|-------------------------|--------------------------------------|
//! | `serverSidePrepare` | `useServerPrepStmts`    | Prepare on the server vs. emulate    |
//! | `clientCache`       | `cachePrepStmts`        | Reuse handles for identical SQL text |
//! | `cacheSizeLimit`    | `prepStmtCacheSqlLimit` | Longest SQL text eligible for cache  |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BenchError, BenchResult};
use crate::parser;

/// Cache size limit applied when a variant does not set one.
pub const DEFAULT_CACHE_SIZE_LIMIT: usize = 256;

/// One benchmark configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigVariant {
    pub name: String,
    pub server_side_prepare: bool,
    pub client_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_size_limit: Option<usize>,
}

impl ConfigVariant {
    pub fn new(
        name: impl Into<String>,
        server_side_prepare: bool,
        client_cache: bool,
        cache_size_limit: Option<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            server_side_prepare,
            client_cache,
            cache_size_limit,
        }
    }

    /// Build a variant from a property string such as
    /// `serverSidePrepare=true&clientCache=true&cacheSizeLimit=2048`.
    ///
    /// Options that are not mentioned default to `false` / unset.
    pub fn from_properties(name: impl Into<String>, props: &str) -> BenchResult<Self> {
        let mut variant = Self::new(name, false, false, None);

        for (key, raw) in parser::parse_properties(props)? {
            match key.as_str() {
                "serverSidePrepare" | "useServerPrepStmts" => {
                    variant.server_side_prepare = parse_flag(&key, &raw)?;
                }
                "clientCache" | "cachePrepStmts" => {
                    variant.client_cache = parse_flag(&key, &raw)?;
                }
                "cacheSizeLimit" | "prepStmtCacheSqlLimit" => {
                    let limit = raw.parse::<usize>().map_err(|_| {
                        BenchError::Config(format!("'{}' expects a length, got '{}'", key, raw))
                    })?;
                    variant.cache_size_limit = Some(limit);
                }
                _ => {
                    return Err(BenchError::Config(format!(
                        "Unknown variant option '{}'",
                        key
                    )));
                }
            }
        }

        Ok(variant)
    }

    /// The canonical property string for this variant.
    pub fn properties(&self) -> String {
        let mut props = format!(
            "serverSidePrepare={}&clientCache={}",
            self.server_side_prepare, self.client_cache
        );
        if let Some(limit) = self.cache_size_limit {
            props.push_str(&format!("&cacheSizeLimit={}", limit));
        }
        props
    }

    /// The cache size limit in effect, falling back to the driver default.
    pub fn effective_cache_size_limit(&self) -> usize {
        self.cache_size_limit.unwrap_or(DEFAULT_CACHE_SIZE_LIMIT)
    }

    /// Whether `sql` would be held by the client-side cache under this variant.
    pub fn caches(&self, sql: &str) -> bool {
        self.client_cache && sql.len() <= self.effective_cache_size_limit()
    }

    /// The four cases the benchmark was designed around, in run order.
    pub fn presets() -> Vec<Self> {
        vec![
            Self::new("client-side, no cache", false, false, None),
            Self::new("server-side, no cache", true, false, None),
            Self::new("server-side + cache", true, true, Some(2048)),
            Self::new("client-side cache only", false, true, None),
        ]
    }
}

impl fmt::Display for ConfigVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.properties())
    }
}

impl FromStr for ConfigVariant {
    type Err = BenchError;

    /// Parse a bare property string; the string doubles as the name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let props = s.trim();
        Self::from_properties(props.trim_start_matches('?'), props)
    }
}

fn parse_flag(key: &str, raw: &str) -> BenchResult<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(BenchError::Config(format!(
            "'{}' expects true or false, got '{}'",
            key, raw
        )))
    }
}
