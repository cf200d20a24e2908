use mempack_types::{HashAlgorithm, ObjectId, ObjectType};

/// Errors from object database backend operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// No object matches an abbreviated id.
    #[error("no object matches prefix {0}")]
    PrefixNotFound(String),

    /// More than one object matches an abbreviated id.
    #[error("ambiguous object prefix {0}")]
    Ambiguous(String),

    /// The backend is closed or its internal state is unusable.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The caller passed a malformed handle or argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An existing object has the same id but a different declared type.
    #[error("object {id} is stored as {stored} but was written as {written}")]
    TypeMismatch {
        id: ObjectId,
        stored: ObjectType,
        written: ObjectType,
    },

    /// An id or pack was produced under a different digest algorithm.
    #[error("hash algorithm mismatch: expected {expected}, got {actual}")]
    AlgorithmMismatch {
        expected: HashAlgorithm,
        actual: HashAlgorithm,
    },

    /// The stored data for an object is inconsistent with its index entry.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// The backend does not implement an optional capability.
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}

impl StoreError {
    /// Returns `true` for "object absent" errors, which a dispatcher treats as
    /// "try the next backend" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::PrefixNotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
