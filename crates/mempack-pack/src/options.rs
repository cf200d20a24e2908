use mempack_types::HashAlgorithm;
use serde::{Deserialize, Serialize};

use crate::codec::PackCodec;
use crate::error::{PackError, PackResult};

/// Settings shared by the encoder, decoder and reader of one pack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackOptions {
    /// Digest algorithm for object ids and the trailer.
    pub algorithm: HashAlgorithm,
    pub codec: PackCodec,
    /// Compression level; `None` uses the codec's default.
    pub compression_level: Option<i32>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Sha1,
            codec: PackCodec::Zlib,
            compression_level: None,
        }
    }
}

impl PackOptions {
    pub fn new(algorithm: HashAlgorithm, codec: PackCodec) -> Self {
        Self {
            algorithm,
            codec,
            compression_level: None,
        }
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// The level the codec actually runs at.
    pub fn level(&self) -> i32 {
        self.compression_level
            .unwrap_or_else(|| self.codec.default_level())
    }

    /// Parse from TOML. Missing keys take their default values.
    pub fn from_toml_str(s: &str) -> PackResult<Self> {
        toml::from_str(s).map_err(|e| PackError::InvalidOptions(e.to_string()))
    }
}
