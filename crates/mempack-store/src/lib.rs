//! In-memory object database backend.
//!
//! [`MemPack`] holds git-style objects in process memory, keyed by their
//! content digest. It plugs into any dispatcher that speaks [`OdbBackend`],
//! and its contents can be handed to `mempack-pack` to produce a standard
//! pack stream.
//!
//! # Layout
//!
//! - [`ObjectArena`] -- append-only payload storage with stable references
//! - [`DigestIndex`] -- digest to arena-slot mapping, in insertion order
//! - [`MemPack`] -- the backend tying both together behind a writer lock
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written; rewriting one is a no-op.
//! 2. Write-then-publish: the payload lands in the arena before its index
//!    entry becomes visible.
//! 3. Reads never take the writer lock.
//! 4. Absence is `NotFound`; every other error means the backend is unusable
//!    or the caller passed something malformed.

pub mod arena;
pub mod config;
pub mod error;
pub mod index;
pub mod memory;
pub mod object;
pub mod traits;

pub use arena::{ArenaRef, ObjectArena};
pub use config::MemPackConfig;
pub use error::{StoreError, StoreResult};
pub use index::{DigestIndex, ObjectEntry};
pub use memory::{Ids, MemPack};
pub use object::{ObjectHeader, RawObject, StoredObject};
pub use traits::{object_count, validate_prefix, OdbBackend, MIN_PREFIX_LEN};
