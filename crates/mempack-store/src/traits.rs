use mempack_types::{HashAlgorithm, ObjectId, ObjectType};

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectHeader, RawObject};

/// Shortest abbreviated id accepted by prefix lookups.
pub const MIN_PREFIX_LEN: usize = 4;

/// Pluggable object database backend.
///
/// A dispatcher holding several backends calls into this surface only.
/// `write`, `read`, `read_header` and `exists` are required; the remaining
/// methods are optional capabilities whose defaults report that the backend
/// does not provide them.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written; the same type and content always
///   produce the same id.
/// - Absence is reported as [`StoreError::NotFound`] by read-style methods
///   and as `false` by `exists`, never as any other error.
/// - Concurrent reads are always safe.
pub trait OdbBackend: Send + Sync {
    /// The digest algorithm every id in this backend is computed with.
    fn algorithm(&self) -> HashAlgorithm;

    /// Store a typed payload and return its id.
    ///
    /// Writing an object that is already present is a no-op that returns the
    /// existing id.
    fn write(&self, kind: ObjectType, data: &[u8]) -> StoreResult<ObjectId>;

    /// Read an object by id.
    fn read(&self, id: &ObjectId) -> StoreResult<RawObject>;

    /// Read an object's type and size without copying its payload.
    ///
    /// The default implementation reads the full object.
    fn read_header(&self, id: &ObjectId) -> StoreResult<ObjectHeader> {
        let object = self.read(id)?;
        Ok(ObjectHeader {
            kind: object.kind,
            size: object.size(),
        })
    }

    /// Check whether an object exists. Never fails.
    fn exists(&self, id: &ObjectId) -> bool;

    /// Read the single object whose id starts with the hex `prefix`.
    fn read_prefix(&self, _prefix: &str) -> StoreResult<(ObjectId, RawObject)> {
        Err(StoreError::Unsupported("read_prefix"))
    }

    /// Resolve a hex prefix to the single matching id.
    fn exists_prefix(&self, _prefix: &str) -> StoreResult<ObjectId> {
        Err(StoreError::Unsupported("exists_prefix"))
    }

    /// Enumerate every stored id.
    ///
    /// Each call returns a fresh, independent, finite iterator.
    fn foreach(&self) -> StoreResult<Box<dyn Iterator<Item = ObjectId> + '_>> {
        Err(StoreError::Unsupported("foreach"))
    }

    /// Number of distinct objects stored.
    fn object_count(&self) -> StoreResult<usize> {
        Err(StoreError::InvalidArgument(
            "backend does not report an object count".into(),
        ))
    }

    /// Drop every object, leaving the backend empty but usable.
    fn reset(&self) -> StoreResult<()> {
        Err(StoreError::Unsupported("reset"))
    }
}

/// Count the objects held by a backend handle.
///
/// A missing handle, or a backend that does not track a count, is an
/// `InvalidArgument` error rather than a count of zero.
pub fn object_count(backend: Option<&dyn OdbBackend>) -> StoreResult<usize> {
    backend
        .ok_or_else(|| StoreError::InvalidArgument("no backend handle".into()))?
        .object_count()
}

/// Check that `prefix` is a usable abbreviated id for `algorithm`.
pub fn validate_prefix(prefix: &str, algorithm: HashAlgorithm) -> StoreResult<()> {
    if prefix.len() < MIN_PREFIX_LEN {
        return Err(StoreError::InvalidArgument(format!(
            "prefix {prefix:?} is shorter than {MIN_PREFIX_LEN} hex digits"
        )));
    }
    if prefix.len() > algorithm.hex_len() {
        return Err(StoreError::InvalidArgument(format!(
            "prefix {prefix:?} is longer than a {algorithm} id"
        )));
    }
    if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(StoreError::InvalidArgument(format!(
            "prefix {prefix:?} is not hexadecimal"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend that only implements the required capabilities.
    struct MinimalBackend;

    impl OdbBackend for MinimalBackend {
        fn algorithm(&self) -> HashAlgorithm {
            HashAlgorithm::Sha1
        }

        fn write(&self, _kind: ObjectType, _data: &[u8]) -> StoreResult<ObjectId> {
            Err(StoreError::Unavailable("read-only".into()))
        }

        fn read(&self, id: &ObjectId) -> StoreResult<RawObject> {
            Err(StoreError::NotFound(*id))
        }

        fn exists(&self, _id: &ObjectId) -> bool {
            false
        }
    }

    #[test]
    fn optional_capabilities_default_to_unsupported() {
        let backend = MinimalBackend;
        assert_eq!(
            backend.foreach().err(),
            Some(StoreError::Unsupported("foreach"))
        );
        assert_eq!(backend.reset(), Err(StoreError::Unsupported("reset")));
        assert!(matches!(
            backend.read_prefix("abcd"),
            Err(StoreError::Unsupported("read_prefix"))
        ));
    }

    #[test]
    fn read_header_defaults_to_read() {
        let id = ObjectId::null(HashAlgorithm::Sha1);
        let err = MinimalBackend.read_header(&id).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn object_count_of_null_handle_fails() {
        let err = object_count(None).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn object_count_without_capability_fails() {
        let err = object_count(Some(&MinimalBackend)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn prefix_validation() {
        assert!(validate_prefix("abcd", HashAlgorithm::Sha1).is_ok());
        assert!(validate_prefix("ABCDEF01", HashAlgorithm::Sha1).is_ok());
        assert!(validate_prefix("abc", HashAlgorithm::Sha1).is_err());
        assert!(validate_prefix("abcg", HashAlgorithm::Sha1).is_err());
        assert!(validate_prefix(&"a".repeat(41), HashAlgorithm::Sha1).is_err());
        assert!(validate_prefix(&"a".repeat(64), HashAlgorithm::Sha256).is_ok());
    }
}
