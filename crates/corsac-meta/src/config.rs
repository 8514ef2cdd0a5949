//! Runtime configuration of the meta-catalog core.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{MetaError, Result};

/// Configuration options of the catalog core.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    /// Replicas per region when a definition declares none.
    pub default_replica: u32,
    /// Interval between periodic metrics sweeps.
    #[serde(with = "humantime_serde")]
    pub metrics_sweep_interval: Duration,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            default_replica: 3,
            metrics_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl MetaConfig {
    /// Load config from TOML and environment variables.
    ///
    /// Environment variables use the `CORSAC__` prefix with `__` separators.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        } else {
            builder = builder.add_source(config::File::with_name("corsac").required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("CORSAC").separator("__"));
        let config: MetaConfig = builder
            .build()
            .map_err(|err| MetaError::IllegalParameters(err.to_string()))?
            .try_deserialize()
            .map_err(|err| MetaError::IllegalParameters(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        if self.default_replica == 0 {
            return Err(MetaError::IllegalParameters(
                "default_replica must be greater than 0".into(),
            ));
        }
        if self.metrics_sweep_interval.is_zero() {
            return Err(MetaError::IllegalParameters(
                "metrics_sweep_interval must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
