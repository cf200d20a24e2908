use mempack_store::StoreError;
use mempack_types::ObjectId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    /// The pack sink rejected a write. Nothing is retried.
    #[error("pack sink is not writable: {0}")]
    Unwritable(std::io::Error),

    #[error("invalid magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u32),

    #[error("checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("corrupt pack entry at offset {offset}: {reason}")]
    CorruptEntry { offset: u64, reason: String },

    #[error("CRC32 mismatch for object {id}")]
    CrcMismatch { id: ObjectId },

    #[error("object at offset {offset} hashes to {actual}, expected {expected}")]
    DigestMismatch {
        offset: u64,
        expected: ObjectId,
        actual: ObjectId,
    },

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("too many objects for one pack: {0}")]
    TooManyObjects(usize),

    #[error("index corrupted: {0}")]
    IndexCorrupted(String),

    #[error("invalid pack options: {0}")]
    InvalidOptions(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type PackResult<T> = Result<T, PackError>;
