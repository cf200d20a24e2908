use mempack_crypto::ObjectHasher;
use mempack_store::{OdbBackend, StoreError};
use mempack_types::{ObjectId, ObjectType};
use tracing::{debug, warn};

use crate::entry::{decode_pack_header, EntryHeader, PACK_HEADER_LEN};
use crate::error::{PackError, PackResult};
use crate::index::PackIndex;
use crate::options::PackOptions;

/// One object recovered from a pack stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedObject {
    /// Digest recomputed from the decoded type and payload.
    pub id: ObjectId,
    pub kind: ObjectType,
    pub data: Vec<u8>,
    /// Byte offset of the entry header within the stream.
    pub offset: u64,
    /// CRC32 of the entry header plus encoded payload.
    pub crc32: u32,
}

/// A fully decoded and verified pack stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedPack {
    /// The stream's trailer digest.
    pub checksum: ObjectId,
    /// Objects in stream order.
    pub objects: Vec<DecodedObject>,
}

impl DecodedPack {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: &ObjectId) -> Option<&DecodedObject> {
        self.objects.iter().find(|o| o.id == *id)
    }

    /// Rebuild the random-access index for this stream.
    pub fn index(&self) -> PackIndex {
        let entries = self
            .objects
            .iter()
            .map(|o| (o.id, o.crc32, o.offset))
            .collect();
        PackIndex::build(entries, self.checksum)
    }
}

/// Parses pack streams produced by [`PackEncoder`](crate::PackEncoder) or git.
///
/// Decoding shares no state with the encoder; everything is rederived from
/// the bytes and the [`PackOptions`].
#[derive(Clone, Debug, Default)]
pub struct PackDecoder {
    options: PackOptions,
}

impl PackDecoder {
    pub fn new(options: PackOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PackOptions {
        &self.options
    }

    /// Validate and decode an entire pack stream.
    ///
    /// Checks the magic, version and trailer digest before decoding any
    /// entry, and rejects bytes left over between the last entry and the
    /// trailer.
    pub fn decode(&self, data: &[u8]) -> PackResult<DecodedPack> {
        let algorithm = self.options.algorithm;
        let digest_len = algorithm.digest_len();
        if data.len() < PACK_HEADER_LEN + digest_len {
            return Err(PackError::CorruptEntry {
                offset: 0,
                reason: "pack data too short".into(),
            });
        }
        let count = decode_pack_header(data)?;

        let hasher = ObjectHasher::new(algorithm);
        let body_len = data.len() - digest_len;
        let (body, trailer) = data.split_at(body_len);
        let computed = hasher.hash_raw(body);
        if computed.as_bytes() != trailer {
            warn!(expected = %hex::encode(trailer), actual = %computed, "pack checksum mismatch");
            return Err(PackError::ChecksumMismatch {
                expected: hex::encode(trailer),
                actual: computed.to_hex(),
            });
        }

        let mut objects = Vec::new();
        let mut pos = PACK_HEADER_LEN;
        for _ in 0..count {
            let offset = pos as u64;
            let (header, header_len) = EntryHeader::decode(&body[pos..], offset)?;
            let size = usize::try_from(header.size).map_err(|_| PackError::CorruptEntry {
                offset,
                reason: format!("entry size {} exceeds address space", header.size),
            })?;
            let (payload, used) = self
                .options
                .codec
                .decompress(&body[pos + header_len..], size)?;
            let end = pos + header_len + used;

            objects.push(DecodedObject {
                id: hasher.hash_object(header.kind, &payload),
                kind: header.kind,
                data: payload,
                offset,
                crc32: crc32fast::hash(&body[pos..end]),
            });
            pos = end;
        }
        if pos != body_len {
            return Err(PackError::CorruptEntry {
                offset: pos as u64,
                reason: format!("{} unexpected bytes before trailer", body_len - pos),
            });
        }

        debug!(objects = objects.len(), checksum = %computed, "decoded pack");
        Ok(DecodedPack {
            checksum: computed,
            objects,
        })
    }

    /// Decode `data` and write every object into `backend`.
    ///
    /// Returns the ids in stream order. Each id the backend reports must
    /// equal the one recomputed during decoding.
    pub fn unpack_into(&self, data: &[u8], backend: &dyn OdbBackend) -> PackResult<Vec<ObjectId>> {
        if backend.algorithm() != self.options.algorithm {
            return Err(StoreError::AlgorithmMismatch {
                expected: self.options.algorithm,
                actual: backend.algorithm(),
            }
            .into());
        }
        let pack = self.decode(data)?;
        let mut ids = Vec::with_capacity(pack.len());
        for object in &pack.objects {
            let written = backend.write(object.kind, &object.data)?;
            if written != object.id {
                return Err(PackError::DigestMismatch {
                    offset: object.offset,
                    expected: object.id,
                    actual: written,
                });
            }
            ids.push(written);
        }
        debug!(objects = ids.len(), "unpacked pack into backend");
        Ok(ids)
    }
}
