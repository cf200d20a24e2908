//! Pack stream encoding for mempack.
//!
//! Turns the contents of a [`MemPack`](mempack_store::MemPack) into a git
//! pack stream and reads such streams back.
//!
//! # Architecture
//!
//! - **Pack stream**: `PACK`, version 2, object count, one
//!   `[type+size varint][encoded payload]` entry per object, then a digest of
//!   everything before it
//! - **Pack index** (`.idx`): git idx v2, fan-out table plus sorted ids for
//!   O(log n) lookups
//! - **PackEncoder**: snapshots a store and writes the stream to any sink
//! - **PackDecoder**: verifies and decodes a whole stream, or unpacks it into
//!   another backend
//! - **PackReader**: random-access reads through an index

pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod entry;
pub mod error;
pub mod index;
pub mod options;
pub mod reader;

pub use codec::PackCodec;
pub use decoder::{DecodedObject, DecodedPack, PackDecoder};
pub use encoder::{PackEncoder, PackFile};
pub use entry::{EntryHeader, PACK_MAGIC, PACK_VERSION};
pub use error::{PackError, PackResult};
pub use index::PackIndex;
pub use options::PackOptions;
pub use reader::PackReader;
