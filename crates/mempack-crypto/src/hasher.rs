use mempack_types::{HashAlgorithm, ObjectId, ObjectType};
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Object digest engine.
///
/// Each hasher is bound to one [`HashAlgorithm`]. The hashed input is the
/// canonical object header (`"blob 5\0"`) followed by the payload, so a blob
/// and a tree with identical bytes produce different ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectHasher {
    algorithm: HashAlgorithm,
}

impl ObjectHasher {
    /// Hasher producing 20-byte SHA-1 ids.
    pub const SHA1: Self = Self {
        algorithm: HashAlgorithm::Sha1,
    };
    /// Hasher producing 32-byte SHA-256 ids.
    pub const SHA256: Self = Self {
        algorithm: HashAlgorithm::Sha256,
    };

    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm this hasher produces ids for.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The canonical header hashed in front of every payload.
    pub fn header(kind: ObjectType, size: usize) -> String {
        format!("{} {}\0", kind.name(), size)
    }

    /// Compute the id of a typed payload.
    pub fn hash_object(&self, kind: ObjectType, data: &[u8]) -> ObjectId {
        let mut hasher = StreamHasher::new(self.algorithm);
        hasher.update(Self::header(kind, data.len()).as_bytes());
        hasher.update(data);
        hasher.finalize()
    }

    /// Verify that a typed payload produces the expected id.
    pub fn verify(&self, kind: ObjectType, data: &[u8], expected: &ObjectId) -> bool {
        expected.algorithm() == self.algorithm && self.hash_object(kind, data) == *expected
    }

    /// Digest of raw bytes with no object header (pack and index trailers).
    pub fn hash_raw(&self, data: &[u8]) -> ObjectId {
        let mut hasher = StreamHasher::new(self.algorithm);
        hasher.update(data);
        hasher.finalize()
    }
}

impl Default for ObjectHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

enum State {
    Sha1(Sha1),
    Sha256(Sha256),
}

/// Incremental digest over a byte stream.
///
/// Used where bytes arrive in pieces, such as the running checksum of a pack
/// stream while entries are written to a sink.
pub struct StreamHasher {
    state: State,
}

impl StreamHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Sha1 => State::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => State::Sha256(Sha256::new()),
        };
        Self { state }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        match self.state {
            State::Sha1(_) => HashAlgorithm::Sha1,
            State::Sha256(_) => HashAlgorithm::Sha256,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            State::Sha1(h) => h.update(data),
            State::Sha256(h) => h.update(data),
        }
    }

    pub fn finalize(self) -> ObjectId {
        match self.state {
            State::Sha1(h) => ObjectId::from_sha1(h.finalize().into()),
            State::Sha256(h) => ObjectId::from_sha256(h.finalize().into()),
        }
    }
}

impl std::fmt::Debug for StreamHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHasher")
            .field("algorithm", &self.algorithm())
            .finish()
    }
}
