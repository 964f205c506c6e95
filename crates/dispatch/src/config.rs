use serde::{Deserialize, Serialize};

use crate::errors::{DispatchError, Result};

/// Upper bound on the number of concurrently dispatched statements.
pub const MAX_WORKERS_LIMIT: usize = 1024;

pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Configuration for the dispatcher.
///
/// Read once when the dispatcher is created. Zero workers disables parallel
/// dispatch entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDispatchConfig")]
pub struct DispatchConfig {
    max_workers: usize,
}

impl DispatchConfig {
    pub fn new(max_workers: usize) -> Result<Self> {
        if max_workers > MAX_WORKERS_LIMIT {
            return Err(DispatchError::InvalidConfig(format!(
                "max_workers must be between 0 and {MAX_WORKERS_LIMIT}, got {max_workers}"
            )));
        }
        Ok(DispatchConfig { max_workers })
    }

    /// Config with parallel dispatch turned off.
    pub const fn disabled() -> Self {
        DispatchConfig { max_workers: 0 }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn is_enabled(&self) -> bool {
        self.max_workers > 0
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

#[derive(Deserialize)]
struct RawDispatchConfig {
    #[serde(default = "default_max_workers")]
    max_workers: usize,
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

impl TryFrom<RawDispatchConfig> for DispatchConfig {
    type Error = DispatchError;

    fn try_from(raw: RawDispatchConfig) -> Result<Self> {
        DispatchConfig::new(raw.max_workers)
    }
}
