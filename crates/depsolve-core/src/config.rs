use std::path::Path;

use depsolve_util::errors::{DepsolveError, DepsolveResult};
use serde::{Deserialize, Serialize};

use crate::requirement::{Requirement, Strictness};
use crate::value::Value;

/// Resolver settings, read from the `[resolver]` table of a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Settings that shape one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Strictness for `~>` requirements parsed through this config.
    #[serde(default)]
    pub strictness: Strictness,
    /// How many availability lookups may run at once while prefetching.
    /// `1` disables the prefetch.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::default(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

fn default_max_concurrent_fetches() -> usize {
    8
}

impl ResolverConfig {
    /// Load the `[resolver]` table from `path`, or return defaults if the file doesn't exist.
    pub fn load(path: &Path) -> DepsolveResult<Self> {
        if !path.is_file() {
            tracing::debug!("No resolver config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            DepsolveError::Config { message } => DepsolveError::Config {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })?;
        tracing::debug!("Loaded resolver config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> DepsolveResult<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| DepsolveError::Config {
            message: format!("Failed to parse resolver config: {e}"),
        })?;
        file.resolver.validate()
    }

    fn validate(self) -> DepsolveResult<Self> {
        if self.max_concurrent_fetches == 0 {
            return Err(DepsolveError::Config {
                message: "max-concurrent-fetches must be at least 1".to_string(),
            });
        }
        Ok(self)
    }

    /// Parse a requirement string with this config's strictness.
    pub fn parse_requirement<M: Value>(&self, input: &str) -> DepsolveResult<Requirement<M>> {
        Requirement::parse(input, self.strictness)
    }
}
