use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use mempack_crypto::ObjectHasher;
use mempack_types::{HashAlgorithm, ObjectId, ObjectType};
use tracing::{debug, warn};

use crate::arena::ObjectArena;
use crate::config::MemPackConfig;
use crate::error::{StoreError, StoreResult};
use crate::index::{DigestIndex, ObjectEntry};
use crate::object::{ObjectHeader, RawObject, StoredObject};
use crate::traits::{validate_prefix, OdbBackend};

/// In-memory object database backend.
///
/// Payloads live in an append-only [`ObjectArena`]; a [`DigestIndex`] maps
/// each id to its arena slot. Writes are serialized by a single writer
/// mutex. Reads never take that mutex, so they proceed alongside each other
/// and alongside an in-flight write. A write appends the payload first and
/// publishes the index entry second, so a reader either sees a complete
/// object or no object.
pub struct MemPack {
    config: MemPackConfig,
    hasher: ObjectHasher,
    writer: Mutex<()>,
    closed: AtomicBool,
    arena: ObjectArena,
    index: DigestIndex,
}

impl MemPack {
    /// Create an empty SHA-1 store.
    pub fn new() -> Self {
        Self::with_config(MemPackConfig::default())
    }

    pub fn with_config(config: MemPackConfig) -> Self {
        Self {
            hasher: ObjectHasher::new(config.algorithm),
            writer: Mutex::new(()),
            closed: AtomicBool::new(false),
            arena: ObjectArena::with_capacity(config.initial_capacity),
            index: DigestIndex::with_capacity(config.initial_capacity),
            config,
        }
    }

    pub fn config(&self) -> &MemPackConfig {
        &self.config
    }

    /// Number of objects currently stored (0 once closed).
    pub fn len(&self) -> usize {
        self.index.len().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total payload bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.arena.total_bytes().unwrap_or(0)
    }

    /// Iterate over stored ids in insertion order.
    ///
    /// The iterator is bounded by the object count at the time of the call;
    /// objects written afterwards are not yielded. If the store is reset
    /// while iterating, the iterator ends early.
    pub fn ids(&self) -> StoreResult<Ids<'_>> {
        self.ensure_open()?;
        let (generation, end) = self.index.cursor()?;
        Ok(Ids {
            index: &self.index,
            generation,
            pos: 0,
            end,
        })
    }

    /// Copy out every object in insertion order.
    ///
    /// Holds the writer mutex for the duration, so no write interleaves;
    /// readers are not blocked. Payloads are shared, not duplicated.
    pub fn snapshot(&self) -> StoreResult<Vec<StoredObject>> {
        self.ensure_open()?;
        let _writer = self.lock_writer()?;
        self.index
            .entries()?
            .into_iter()
            .map(|entry| -> StoreResult<StoredObject> {
                let data = self.payload(&entry)?;
                Ok(StoredObject {
                    id: entry.id,
                    kind: entry.kind,
                    data,
                })
            })
            .collect()
    }

    /// Release all objects and mark the store unusable.
    ///
    /// Afterwards every fallible operation reports
    /// [`StoreError::Unavailable`] and `exists` answers `false`.
    pub fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        let _writer = self.lock_writer()?;
        self.index.clear()?;
        self.arena.clear()?;
        debug!("mempack closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Unavailable("mempack has been closed".into()));
        }
        Ok(())
    }

    fn lock_writer(&self) -> StoreResult<std::sync::MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|_| StoreError::Unavailable("writer lock poisoned".into()))
    }

    fn entry(&self, id: &ObjectId) -> StoreResult<ObjectEntry> {
        self.ensure_open()?;
        self.index.get(id)?.ok_or(StoreError::NotFound(*id))
    }

    fn payload(&self, entry: &ObjectEntry) -> StoreResult<bytes::Bytes> {
        // A miss here means a reset raced with the caller's lookup.
        self.arena
            .read(entry.location)?
            .ok_or(StoreError::NotFound(entry.id))
    }

    fn resolve_prefix(&self, prefix: &str) -> StoreResult<ObjectId> {
        self.ensure_open()?;
        validate_prefix(prefix, self.config.algorithm)?;
        let matches = self.index.find_prefix(prefix, 2)?;
        match matches.as_slice() {
            [] => Err(StoreError::PrefixNotFound(prefix.to_string())),
            [id] => Ok(*id),
            _ => Err(StoreError::Ambiguous(prefix.to_string())),
        }
    }
}

/// Reject a write whose id is already stored under a different type or size.
///
/// The type header is part of the hashed input, so disagreement means a
/// digest collision or a corrupted entry; aliasing the two would hand readers
/// the wrong object.
fn check_agreement(existing: &ObjectEntry, kind: ObjectType, size: u64) -> StoreResult<()> {
    if existing.kind != kind {
        warn!(id = %existing.id, stored = %existing.kind, written = %kind, "object type mismatch");
        return Err(StoreError::TypeMismatch {
            id: existing.id,
            stored: existing.kind,
            written: kind,
        });
    }
    if existing.size != size {
        warn!(id = %existing.id, stored = existing.size, written = size, "object size mismatch");
        return Err(StoreError::CorruptObject {
            id: existing.id,
            reason: format!("stored size {} but written size {size}", existing.size),
        });
    }
    Ok(())
}

impl Default for MemPack {
    fn default() -> Self {
        Self::new()
    }
}

impl OdbBackend for MemPack {
    fn algorithm(&self) -> HashAlgorithm {
        self.config.algorithm
    }

    fn write(&self, kind: ObjectType, data: &[u8]) -> StoreResult<ObjectId> {
        self.ensure_open()?;
        let id = self.hasher.hash_object(kind, data);
        let size = data.len() as u64;

        let _writer = self.lock_writer()?;
        // `close` may have won the race for the writer lock.
        self.ensure_open()?;
        if let Some(existing) = self.index.get(&id)? {
            check_agreement(&existing, kind, size)?;
            debug!(%id, "object already present");
            return Ok(id);
        }

        let location = self.arena.append(data)?;
        self.index.insert(ObjectEntry {
            id,
            kind,
            size,
            location,
        })?;
        debug!(%id, %kind, size, "stored object");
        Ok(id)
    }

    fn read(&self, id: &ObjectId) -> StoreResult<RawObject> {
        let entry = self.entry(id)?;
        let data = self.payload(&entry)?;
        Ok(RawObject {
            kind: entry.kind,
            data,
        })
    }

    fn read_header(&self, id: &ObjectId) -> StoreResult<ObjectHeader> {
        let entry = self.entry(id)?;
        Ok(ObjectHeader {
            kind: entry.kind,
            size: entry.size,
        })
    }

    fn exists(&self, id: &ObjectId) -> bool {
        !self.is_closed() && matches!(self.index.contains(id), Ok(true))
    }

    fn read_prefix(&self, prefix: &str) -> StoreResult<(ObjectId, RawObject)> {
        let id = self.resolve_prefix(prefix)?;
        let object = self.read(&id)?;
        Ok((id, object))
    }

    fn exists_prefix(&self, prefix: &str) -> StoreResult<ObjectId> {
        self.resolve_prefix(prefix)
    }

    fn foreach(&self) -> StoreResult<Box<dyn Iterator<Item = ObjectId> + '_>> {
        Ok(Box::new(self.ids()?))
    }

    fn object_count(&self) -> StoreResult<usize> {
        self.ensure_open()?;
        self.index.len()
    }

    fn reset(&self) -> StoreResult<()> {
        self.ensure_open()?;
        let _writer = self.lock_writer()?;
        let dropped = self.index.len()?;
        // Index first, so no reader resolves an entry into a cleared arena.
        self.index.clear()?;
        self.arena.clear()?;
        debug!(dropped, "mempack reset");
        Ok(())
    }
}

impl std::fmt::Debug for MemPack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemPack")
            .field("algorithm", &self.config.algorithm)
            .field("object_count", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Lazy, finite iterator over the ids of a [`MemPack`], in insertion order.
pub struct Ids<'a> {
    index: &'a DigestIndex,
    generation: u64,
    pos: usize,
    end: usize,
}

impl Iterator for Ids<'_> {
    type Item = ObjectId;

    fn next(&mut self) -> Option<ObjectId> {
        if self.pos >= self.end {
            return None;
        }
        match self.index.id_at(self.generation, self.pos) {
            Ok(Some(id)) => {
                self.pos += 1;
                Some(id)
            }
            _ => {
                self.pos = self.end;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.end - self.pos))
    }
}
