use std::path::Path;

use mempack_crypto::ObjectHasher;
use mempack_store::{RawObject, StoreError};
use mempack_types::ObjectId;
use tracing::warn;

use crate::entry::{decode_pack_header, EntryHeader, PACK_HEADER_LEN};
use crate::error::{PackError, PackResult};
use crate::index::PackIndex;
use crate::options::PackOptions;

/// Reads objects from a pack stream using an index for random access.
#[derive(Debug)]
pub struct PackReader {
    pack_data: Vec<u8>,
    index: PackIndex,
    options: PackOptions,
}

impl PackReader {
    /// Wrap pack bytes and their index.
    ///
    /// The header must be valid, the trailer must equal the index's pack
    /// checksum, and the declared object count must match the index.
    pub fn from_bytes(
        pack_data: Vec<u8>,
        index: PackIndex,
        options: PackOptions,
    ) -> PackResult<Self> {
        if index.algorithm() != options.algorithm {
            return Err(StoreError::AlgorithmMismatch {
                expected: options.algorithm,
                actual: index.algorithm(),
            }
            .into());
        }
        let digest_len = options.algorithm.digest_len();
        let count = decode_pack_header(&pack_data)?;
        if pack_data.len() < PACK_HEADER_LEN + digest_len {
            return Err(PackError::CorruptEntry {
                offset: 0,
                reason: "pack data too short".into(),
            });
        }

        let trailer = &pack_data[pack_data.len() - digest_len..];
        if trailer != index.pack_checksum.as_bytes() {
            return Err(PackError::ChecksumMismatch {
                expected: index.pack_checksum.to_hex(),
                actual: hex::encode(trailer),
            });
        }
        if count as usize != index.object_count() {
            return Err(PackError::IndexCorrupted(format!(
                "pack declares {count} objects, index has {}",
                index.object_count()
            )));
        }
        Ok(Self {
            pack_data,
            index,
            options,
        })
    }

    /// Open a flushed pack and the `.idx` beside it.
    pub fn open(pack_path: &Path, options: PackOptions) -> PackResult<Self> {
        let pack_data = std::fs::read(pack_path)?;
        let index_data = std::fs::read(pack_path.with_extension("idx"))?;
        let index = PackIndex::from_bytes(&index_data, options.algorithm)?;
        Self::from_bytes(pack_data, index, options)
    }

    /// Read an object by id. `Ok(None)` if the pack does not contain it.
    pub fn read_object(&self, id: &ObjectId) -> PackResult<Option<RawObject>> {
        let Some((offset, expected_crc)) = self.index.lookup(id) else {
            return Ok(None);
        };
        self.read_at_offset(id, offset, expected_crc).map(Some)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index.contains(id)
    }

    pub fn object_count(&self) -> usize {
        self.index.object_count()
    }

    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// All object ids, ascending.
    pub fn object_ids(&self) -> &[ObjectId] {
        self.index.ids()
    }

    pub fn checksum(&self) -> &ObjectId {
        &self.index.pack_checksum
    }

    fn read_at_offset(
        &self,
        id: &ObjectId,
        offset: u64,
        expected_crc: u32,
    ) -> PackResult<RawObject> {
        let body_len = self.pack_data.len() - self.options.algorithm.digest_len();
        let body = &self.pack_data[..body_len];
        let start = usize::try_from(offset)
            .ok()
            .filter(|&s| (PACK_HEADER_LEN..body_len).contains(&s))
            .ok_or_else(|| PackError::CorruptEntry {
                offset,
                reason: "offset outside pack data".into(),
            })?;

        let (header, header_len) = EntryHeader::decode(&body[start..], offset)?;
        let size = usize::try_from(header.size).map_err(|_| PackError::CorruptEntry {
            offset,
            reason: format!("entry size {} exceeds address space", header.size),
        })?;
        let (data, used) = self
            .options
            .codec
            .decompress(&body[start + header_len..], size)?;

        let end = start + header_len + used;
        if crc32fast::hash(&body[start..end]) != expected_crc {
            warn!(%id, offset, "pack entry CRC mismatch");
            return Err(PackError::CrcMismatch { id: *id });
        }

        let actual = ObjectHasher::new(self.options.algorithm).hash_object(header.kind, &data);
        if actual != *id {
            warn!(%id, %actual, offset, "pack entry digest mismatch");
            return Err(PackError::DigestMismatch {
                offset,
                expected: *id,
                actual,
            });
        }

        Ok(RawObject::new(header.kind, data))
    }
}
