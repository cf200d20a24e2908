//! Append-only payload storage.

use std::sync::RwLock;

use bytes::Bytes;

use crate::error::{StoreError, StoreResult};

/// Stable reference to a payload held by an [`ObjectArena`].
///
/// A reference carries the arena epoch it was issued in. After
/// [`ObjectArena::clear`] the epoch advances and older references resolve to
/// nothing instead of aliasing whatever was appended into the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArenaRef {
    epoch: u64,
    slot: usize,
}

impl ArenaRef {
    /// Position of the payload in append order.
    pub fn slot(&self) -> usize {
        self.slot
    }
}

struct Slots {
    epoch: u64,
    payloads: Vec<Bytes>,
    total_bytes: u64,
}

/// Owns the raw bytes of every stored object.
///
/// Payloads are copied into reference-counted [`Bytes`] buffers before the
/// slot lock is taken, so the lock only covers pushing a finished buffer.
/// Readers clone the buffer handle and never observe a partial append.
pub struct ObjectArena {
    slots: RwLock<Slots>,
}

impl ObjectArena {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an arena with room for `capacity` payloads before reallocating
    /// its slot table.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(Slots {
                epoch: 0,
                payloads: Vec::with_capacity(capacity),
                total_bytes: 0,
            }),
        }
    }

    /// Copy `data` into the arena and return a reference to it.
    pub fn append(&self, data: &[u8]) -> StoreResult<ArenaRef> {
        let payload = Bytes::copy_from_slice(data);
        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        let slot = slots.payloads.len();
        slots.total_bytes += payload.len() as u64;
        slots.payloads.push(payload);
        Ok(ArenaRef {
            epoch: slots.epoch,
            slot,
        })
    }

    /// Resolve a reference to its payload.
    ///
    /// Returns `Ok(None)` if the reference predates the last `clear`.
    pub fn read(&self, location: ArenaRef) -> StoreResult<Option<Bytes>> {
        let slots = self.slots.read().map_err(|_| poisoned())?;
        if slots.epoch != location.epoch {
            return Ok(None);
        }
        Ok(slots.payloads.get(location.slot).cloned())
    }

    /// Number of payloads appended since the last `clear`.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.slots.read().map_err(|_| poisoned())?.payloads.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Sum of all payload sizes.
    pub fn total_bytes(&self) -> StoreResult<u64> {
        Ok(self.slots.read().map_err(|_| poisoned())?.total_bytes)
    }

    /// Drop every payload and invalidate all outstanding references.
    ///
    /// Buffers already handed to readers stay alive until those readers drop
    /// them.
    pub fn clear(&self) -> StoreResult<()> {
        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        slots.epoch += 1;
        slots.payloads = Vec::new();
        slots.total_bytes = 0;
        Ok(())
    }
}

impl Default for ObjectArena {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObjectArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectArena")
            .field("payloads", &self.len().ok())
            .field("total_bytes", &self.total_bytes().ok())
            .finish()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("arena lock poisoned".into())
}
