use mempack_types::HashAlgorithm;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for a [`MemPack`](crate::MemPack) store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemPackConfig {
    /// Digest algorithm; fixed for the lifetime of the store.
    pub algorithm: HashAlgorithm,
    /// Number of objects to reserve index and arena room for up front.
    pub initial_capacity: usize,
}

impl Default for MemPackConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Sha1,
            initial_capacity: 64,
        }
    }
}

impl MemPackConfig {
    /// Default configuration with 32-byte SHA-256 ids.
    pub fn sha256() -> Self {
        Self {
            algorithm: HashAlgorithm::Sha256,
            ..Default::default()
        }
    }

    /// Parse from TOML. Missing keys take their default values.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::InvalidArgument(format!("invalid config: {e}")))
    }
}
