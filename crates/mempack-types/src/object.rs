use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Width of the widest supported digest (SHA-256).
pub const MAX_RAW_LEN: usize = 32;

/// The digest family a store, pack, or index is fixed to.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// 20-byte SHA-1 digests.
    #[default]
    Sha1,
    /// 32-byte SHA-256 digests.
    Sha256,
}

impl HashAlgorithm {
    /// Raw digest width in bytes.
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    /// Width of the hex encoding.
    pub const fn hex_len(self) -> usize {
        self.digest_len() * 2
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// Infer the algorithm from a full-length hex id.
    pub fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            40 => Some(Self::Sha1),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            other => Err(TypeError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Content-addressed identifier for a stored object.
///
/// An `ObjectId` is the digest of an object's type header and content under
/// one [`HashAlgorithm`]. Identical type and content always produce the same
/// `ObjectId`. SHA-1 ids only use the first 20 bytes of the backing array;
/// the tail stays zeroed so equality and hashing never see stale bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    bytes: [u8; MAX_RAW_LEN],
    algorithm: HashAlgorithm,
}

impl ObjectId {
    /// Build an id from a raw digest of exactly `algorithm.digest_len()` bytes.
    pub fn from_raw(algorithm: HashAlgorithm, raw: &[u8]) -> Result<Self, TypeError> {
        let expected = algorithm.digest_len();
        if raw.len() != expected {
            return Err(TypeError::InvalidLength {
                expected,
                actual: raw.len(),
            });
        }
        let mut bytes = [0u8; MAX_RAW_LEN];
        bytes[..expected].copy_from_slice(raw);
        Ok(Self { bytes, algorithm })
    }

    /// Wrap a finished SHA-1 digest.
    pub fn from_sha1(raw: [u8; 20]) -> Self {
        let mut bytes = [0u8; MAX_RAW_LEN];
        bytes[..20].copy_from_slice(&raw);
        Self {
            bytes,
            algorithm: HashAlgorithm::Sha1,
        }
    }

    /// Wrap a finished SHA-256 digest.
    pub fn from_sha256(raw: [u8; 32]) -> Self {
        Self {
            bytes: raw,
            algorithm: HashAlgorithm::Sha256,
        }
    }

    /// The null object ID (all zeros) for the given algorithm.
    pub const fn null(algorithm: HashAlgorithm) -> Self {
        Self {
            bytes: [0u8; MAX_RAW_LEN],
            algorithm,
        }
    }

    /// Returns `true` if this is the null object ID.
    pub fn is_null(&self) -> bool {
        self.bytes == [0u8; MAX_RAW_LEN]
    }

    /// The algorithm this id was computed with.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The raw digest, `algorithm().digest_len()` bytes long.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.algorithm.digest_len()]
    }

    /// Hex-encoded string representation (lowercase).
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Short hex representation (first 7 characters).
    pub fn short_hex(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(7);
        hex
    }

    /// Parse a full-length hex id for the given algorithm.
    pub fn from_hex(s: &str, algorithm: HashAlgorithm) -> Result<Self, TypeError> {
        if s.len() != algorithm.hex_len() {
            return Err(TypeError::InvalidLength {
                expected: algorithm.hex_len(),
                actual: s.len(),
            });
        }
        let raw = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_raw(algorithm, &raw)
    }

    /// Parse a full-length hex id, inferring the algorithm from its length.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let algorithm = HashAlgorithm::from_hex_len(s.len()).ok_or(TypeError::InvalidLength {
            expected: HashAlgorithm::Sha1.hex_len(),
            actual: s.len(),
        })?;
        Self::from_hex(s, algorithm)
    }

    /// Returns `true` if the hex form of this id starts with `prefix`.
    ///
    /// The comparison is case-insensitive. An empty prefix matches every id.
    pub fn matches_hex_prefix(&self, prefix: &str) -> bool {
        if prefix.len() > self.algorithm.hex_len() {
            return false;
        }
        self.to_hex()
            .bytes()
            .zip(prefix.bytes())
            .all(|(ours, theirs)| ours == theirs.to_ascii_lowercase())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}:{})", self.algorithm, self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
