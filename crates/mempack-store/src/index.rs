//! Digest-keyed index over arena payloads.

use std::collections::HashMap;
use std::sync::RwLock;

use mempack_types::{ObjectId, ObjectType};

use crate::arena::ArenaRef;
use crate::error::{StoreError, StoreResult};

/// Index record for one stored object. Immutable once created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectEntry {
    pub id: ObjectId,
    pub kind: ObjectType,
    /// Uncompressed payload size in bytes.
    pub size: u64,
    pub location: ArenaRef,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<ObjectId, ObjectEntry>,
    /// Insertion order, which is also arena order.
    order: Vec<ObjectId>,
    /// Bumped by every `clear`.
    generation: u64,
}

/// Mapping from digest to [`ObjectEntry`].
///
/// Grows monotonically; entries are never removed individually. Uniqueness
/// is enforced by [`DigestIndex::insert`], which leaves an existing entry in
/// place.
pub struct DigestIndex {
    inner: RwLock<Inner>,
}

impl DigestIndex {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::with_capacity(capacity),
                order: Vec::with_capacity(capacity),
                generation: 0,
            }),
        }
    }

    pub fn get(&self, id: &ObjectId) -> StoreResult<Option<ObjectEntry>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.entries.get(id).copied())
    }

    pub fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.entries.contains_key(id))
    }

    /// Publish an entry. Returns `false` (and keeps the existing entry) if
    /// the digest is already indexed.
    pub fn insert(&self, entry: ObjectEntry) -> StoreResult<bool> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        if inner.entries.contains_key(&entry.id) {
            return Ok(false);
        }
        inner.entries.insert(entry.id, entry);
        inner.order.push(entry.id);
        Ok(true)
    }

    /// Current generation and length, read together.
    pub fn cursor(&self) -> StoreResult<(u64, usize)> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok((inner.generation, inner.order.len()))
    }

    /// The digest inserted at position `pos`, if the index has not been
    /// cleared since `generation`.
    pub fn id_at(&self, generation: u64, pos: usize) -> StoreResult<Option<ObjectId>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        if inner.generation != generation {
            return Ok(None);
        }
        Ok(inner.order.get(pos).copied())
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> StoreResult<Vec<ObjectEntry>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(id).copied())
            .collect())
    }

    /// Up to `limit` digests whose hex form starts with `prefix`.
    pub fn find_prefix(&self, prefix: &str, limit: usize) -> StoreResult<Vec<ObjectId>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner
            .order
            .iter()
            .filter(|id| id.matches_hex_prefix(prefix))
            .take(limit)
            .copied()
            .collect())
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.inner.read().map_err(|_| poisoned())?.order.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        let generation = inner.generation.wrapping_add(1);
        *inner = Inner {
            generation,
            ..Inner::default()
        };
        Ok(())
    }
}

impl Default for DigestIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DigestIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestIndex")
            .field("entries", &self.len().ok())
            .finish()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("index lock poisoned".into())
}
