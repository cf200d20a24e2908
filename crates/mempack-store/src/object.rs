use bytes::Bytes;
use mempack_types::{ObjectId, ObjectType};

/// An object's payload as returned by `read`.
///
/// `data` is a shared view into the store's arena; holding it does not block
/// writers or keep the store locked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawObject {
    pub kind: ObjectType,
    pub data: Bytes,
}

impl RawObject {
    pub fn new(kind: ObjectType, data: impl Into<Bytes>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    /// Size of `data` in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Type and size of an object, without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectHeader {
    pub kind: ObjectType,
    pub size: u64,
}

/// One object of a point-in-time store snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub id: ObjectId,
    pub kind: ObjectType,
    pub data: Bytes,
}

impl StoredObject {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
