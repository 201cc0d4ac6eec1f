use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::operators::{self, RewriteRule};

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Settings for one run. Missing JSON fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Hard limit for each test invocation.
    pub timeout_ms: u64,
    /// Size of the worker pool.
    pub workers: usize,
    pub interpreter: String,
    /// Scratch directory prefix; random when absent.
    pub session_id: Option<String>,
    pub catalog: Vec<RewriteRule>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            workers: default_workers(),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            session_id: None,
            catalog: operators::default_catalog(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl KernelConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: KernelConfig =
            serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        for rule in &self.catalog {
            rule.validate()?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
