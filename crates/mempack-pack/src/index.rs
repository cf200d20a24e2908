use mempack_crypto::ObjectHasher;
use mempack_types::{HashAlgorithm, ObjectId};

use crate::entry::{read_u32, read_u64};
use crate::error::{PackError, PackResult};

/// Magic bytes opening a version 2 pack index.
pub const INDEX_MAGIC: &[u8; 4] = b"\xfftOc";

pub const INDEX_VERSION: u32 = 2;

/// Offsets at or above this value go to the 64-bit large-offset table.
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

const FAN_OUT_LEN: usize = 256;

/// Pack index for random-access lookups.
///
/// Serialized in git's idx v2 layout:
/// - magic and version
/// - fan-out table: 256 counts of objects whose first byte is <= the slot
/// - sorted object ids
/// - CRC32 of each entry's bytes (parallel to the ids)
/// - 31-bit offsets; an entry with the high bit set indexes the large-offset
///   table instead
/// - 64-bit large offsets
/// - pack checksum, then a checksum of the index itself
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackIndex {
    pub fan_out: [u32; FAN_OUT_LEN],
    pub object_ids: Vec<ObjectId>,
    pub crc32s: Vec<u32>,
    pub offsets: Vec<u64>,
    /// Trailer digest of the pack this index describes.
    pub pack_checksum: ObjectId,
}

impl PackIndex {
    /// Build an index from `(id, crc32, offset)` entries and the pack trailer.
    pub fn build(mut entries: Vec<(ObjectId, u32, u64)>, pack_checksum: ObjectId) -> Self {
        entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        let mut object_ids = Vec::with_capacity(entries.len());
        let mut crc32s = Vec::with_capacity(entries.len());
        let mut offsets = Vec::with_capacity(entries.len());
        for (id, crc, offset) in entries {
            object_ids.push(id);
            crc32s.push(crc);
            offsets.push(offset);
        }

        Self {
            fan_out: build_fan_out(&object_ids),
            object_ids,
            crc32s,
            offsets,
            pack_checksum,
        }
    }

    /// Digest algorithm of the indexed pack.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.pack_checksum.algorithm()
    }

    /// Look up an object's `(offset, crc32)` by id.
    pub fn lookup(&self, id: &ObjectId) -> Option<(u64, u32)> {
        if id.algorithm() != self.algorithm() {
            return None;
        }
        let first_byte = id.as_bytes()[0] as usize;
        let start = if first_byte == 0 {
            0
        } else {
            self.fan_out[first_byte - 1] as usize
        };
        let end = self.fan_out[first_byte] as usize;

        let range = self.object_ids.get(start..end)?;
        let pos = range
            .binary_search_by(|probe| probe.as_bytes().cmp(id.as_bytes()))
            .ok()?;
        let idx = start + pos;
        Some((*self.offsets.get(idx)?, *self.crc32s.get(idx)?))
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.lookup(id).is_some()
    }

    pub fn object_count(&self) -> usize {
        self.object_ids.len()
    }

    /// Indexed ids in ascending order.
    pub fn ids(&self) -> &[ObjectId] {
        &self.object_ids
    }

    /// Serialize in idx v2 layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let digest_len = self.algorithm().digest_len();
        let count = self.object_ids.len();
        let mut buf =
            Vec::with_capacity(8 + FAN_OUT_LEN * 4 + count * (digest_len + 8) + 2 * digest_len);

        buf.extend_from_slice(INDEX_MAGIC);
        buf.extend_from_slice(&INDEX_VERSION.to_be_bytes());
        for &count in &self.fan_out {
            buf.extend_from_slice(&count.to_be_bytes());
        }
        for id in &self.object_ids {
            buf.extend_from_slice(id.as_bytes());
        }
        for &crc in &self.crc32s {
            buf.extend_from_slice(&crc.to_be_bytes());
        }

        let mut large = Vec::new();
        for &offset in &self.offsets {
            if offset < u64::from(LARGE_OFFSET_FLAG) {
                buf.extend_from_slice(&(offset as u32).to_be_bytes());
            } else {
                let slot = LARGE_OFFSET_FLAG | large.len() as u32;
                buf.extend_from_slice(&slot.to_be_bytes());
                large.push(offset);
            }
        }
        for offset in large {
            buf.extend_from_slice(&offset.to_be_bytes());
        }

        buf.extend_from_slice(self.pack_checksum.as_bytes());
        let own = ObjectHasher::new(self.algorithm()).hash_raw(&buf);
        buf.extend_from_slice(own.as_bytes());
        buf
    }

    /// Parse an idx v2 file whose ids were computed with `algorithm`.
    pub fn from_bytes(data: &[u8], algorithm: HashAlgorithm) -> PackResult<Self> {
        let digest_len = algorithm.digest_len();
        let fixed = 8 + FAN_OUT_LEN * 4;
        if data.len() < fixed + 2 * digest_len {
            return Err(PackError::IndexCorrupted("too short".into()));
        }
        if &data[0..4] != INDEX_MAGIC {
            return Err(PackError::InvalidMagic {
                expected: "\\377tOc".into(),
                actual: String::from_utf8_lossy(&data[0..4]).into(),
            });
        }
        let version = read_u32(&data[4..8]);
        if version != INDEX_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        let body_len = data.len() - digest_len;
        let stored = &data[body_len..];
        let computed = ObjectHasher::new(algorithm).hash_raw(&data[..body_len]);
        if computed.as_bytes() != stored {
            return Err(PackError::ChecksumMismatch {
                expected: hex::encode(stored),
                actual: computed.to_hex(),
            });
        }

        let mut pos = 8;
        let mut fan_out = [0u32; FAN_OUT_LEN];
        for slot in &mut fan_out {
            *slot = read_u32(&data[pos..]);
            pos += 4;
        }
        if fan_out.windows(2).any(|w| w[0] > w[1]) {
            return Err(PackError::IndexCorrupted("fan-out is not monotonic".into()));
        }

        let count = fan_out[FAN_OUT_LEN - 1] as usize;
        let tables = count
            .checked_mul(digest_len + 8)
            .ok_or_else(|| PackError::IndexCorrupted("object count overflows".into()))?;
        if data.len() < fixed + tables + 2 * digest_len {
            return Err(PackError::IndexCorrupted("tables truncated".into()));
        }

        let mut object_ids = Vec::with_capacity(count);
        for _ in 0..count {
            let id = ObjectId::from_raw(algorithm, &data[pos..pos + digest_len])
                .map_err(|e| PackError::IndexCorrupted(e.to_string()))?;
            object_ids.push(id);
            pos += digest_len;
        }
        if object_ids
            .windows(2)
            .any(|w| w[0].as_bytes() >= w[1].as_bytes())
        {
            return Err(PackError::IndexCorrupted("object ids are not sorted".into()));
        }
        if fan_out != build_fan_out(&object_ids) {
            return Err(PackError::IndexCorrupted("fan-out does not match ids".into()));
        }

        let mut crc32s = Vec::with_capacity(count);
        for _ in 0..count {
            crc32s.push(read_u32(&data[pos..]));
            pos += 4;
        }

        let mut small = Vec::with_capacity(count);
        for _ in 0..count {
            small.push(read_u32(&data[pos..]));
            pos += 4;
        }

        let large_count = small.iter().filter(|&&o| o & LARGE_OFFSET_FLAG != 0).count();
        if data.len() != pos + large_count * 8 + 2 * digest_len {
            return Err(PackError::IndexCorrupted(
                "large-offset table size mismatch".into(),
            ));
        }
        let large_table = &data[pos..pos + large_count * 8];
        let mut offsets = Vec::with_capacity(count);
        for raw in small {
            if raw & LARGE_OFFSET_FLAG == 0 {
                offsets.push(u64::from(raw));
                continue;
            }
            let slot = (raw & !LARGE_OFFSET_FLAG) as usize;
            if slot >= large_count {
                return Err(PackError::IndexCorrupted(format!(
                    "large offset slot {slot} out of range"
                )));
            }
            offsets.push(read_u64(&large_table[slot * 8..]));
        }
        pos += large_count * 8;

        let pack_checksum = ObjectId::from_raw(algorithm, &data[pos..pos + digest_len])
            .map_err(|e| PackError::IndexCorrupted(e.to_string()))?;

        Ok(Self {
            fan_out,
            object_ids,
            crc32s,
            offsets,
            pack_checksum,
        })
    }
}

/// `fan_out[b]` counts ids whose first byte is <= `b`. Expects sorted ids.
fn build_fan_out(ids: &[ObjectId]) -> [u32; FAN_OUT_LEN] {
    let mut table = [0u32; FAN_OUT_LEN];
    for id in ids {
        table[id.as_bytes()[0] as usize] += 1;
    }
    let mut running = 0;
    for slot in &mut table {
        running += *slot;
        *slot = running;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ids(n: usize) -> Vec<ObjectId> {
        (0..n)
            .map(|i| ObjectHasher::SHA1.hash_raw(format!("object-{i}").as_bytes()))
            .collect()
    }

    fn checksum() -> ObjectId {
        ObjectHasher::SHA1.hash_raw(b"pack")
    }

    fn build(n: usize) -> (Vec<ObjectId>, PackIndex) {
        let ids = make_ids(n);
        let entries = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i as u32 * 7, 12 + i as u64 * 100))
            .collect();
        (ids, PackIndex::build(entries, checksum()))
    }

    #[test]
    fn lookup_with_short_tables_is_absent() {
        let (ids, mut idx) = build(4);
        idx.offsets.truncate(1);
        idx.crc32s.clear();
        for id in &ids {
            assert_eq!(idx.lookup(id), None);
            assert!(!idx.contains(id));
        }
    }

    #[test]
    fn build_empty_index() {
        let idx = PackIndex::build(vec![], checksum());
        assert_eq!(idx.object_count(), 0);
        assert!(idx.fan_out.iter().all(|&c| c == 0));
        assert!(!idx.contains(&make_ids(1)[0]));
    }

    #[test]
    fn build_and_lookup_single() {
        let id = make_ids(1)[0];
        let idx = PackIndex::build(vec![(id, 42, 100)], checksum());
        assert_eq!(idx.object_count(), 1);
        assert_eq!(idx.lookup(&id), Some((100, 42)));
    }

    #[test]
    fn lookup_missing_returns_none() {
        let (_, idx) = build(3);
        let missing = ObjectHasher::SHA1.hash_raw(b"missing");
        assert!(idx.lookup(&missing).is_none());
        assert!(!idx.contains(&ObjectId::null(HashAlgorithm::Sha1)));
    }

    #[test]
    fn lookup_other_algorithm_returns_none() {
        let (ids, idx) = build(1);
        let mut wide = [0u8; 32];
        wide[..20].copy_from_slice(ids[0].as_bytes());
        assert!(idx.lookup(&ObjectId::from_sha256(wide)).is_none());
    }

    #[test]
    fn ids_are_sorted_and_fan_out_counts() {
        let (ids, idx) = build(300);
        assert!(idx.ids().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(idx.fan_out[255], 300);
        for id in &ids {
            let first = id.as_bytes()[0] as usize;
            let below = idx.ids().iter().filter(|i| (i.as_bytes()[0] as usize) <= first).count();
            assert_eq!(idx.fan_out[first] as usize, below);
            assert!(idx.contains(id));
        }
    }

    #[test]
    fn serialization_roundtrip() {
        let (ids, idx) = build(50);
        let bytes = idx.to_bytes();
        assert_eq!(&bytes[..4], INDEX_MAGIC);
        let parsed = PackIndex::from_bytes(&bytes, HashAlgorithm::Sha1).unwrap();
        assert_eq!(parsed, idx);
        for id in &ids {
            assert_eq!(parsed.lookup(id), idx.lookup(id));
        }
    }

    #[test]
    fn large_offsets_use_the_extended_table() {
        let ids = make_ids(3);
        let entries = vec![
            (ids[0], 1, 12),
            (ids[1], 2, 0x8000_0000),
            (ids[2], 3, 0x1_2345_6789),
        ];
        let idx = PackIndex::build(entries, checksum());
        let bytes = idx.to_bytes();
        // 8 + 1024 + 3 * (20 + 4 + 4) + 2 * 8 + 20 + 20
        assert_eq!(bytes.len(), 8 + 1024 + 84 + 16 + 40);
        let parsed = PackIndex::from_bytes(&bytes, HashAlgorithm::Sha1).unwrap();
        assert_eq!(parsed.lookup(&ids[1]), Some((0x8000_0000, 2)));
        assert_eq!(parsed.lookup(&ids[2]), Some((0x1_2345_6789, 3)));
    }

    #[test]
    fn sha256_index_roundtrip() {
        let ids: Vec<ObjectId> = (0..4u8)
            .map(|i| ObjectHasher::SHA256.hash_raw(&[i]))
            .collect();
        let entries = ids.iter().map(|id| (*id, 0, 12)).collect();
        let idx = PackIndex::build(entries, ObjectHasher::SHA256.hash_raw(b"pack"));
        let bytes = idx.to_bytes();
        let parsed = PackIndex::from_bytes(&bytes, HashAlgorithm::Sha256).unwrap();
        assert_eq!(parsed.algorithm(), HashAlgorithm::Sha256);
        assert!(ids.iter().all(|id| parsed.contains(id)));
        assert!(PackIndex::from_bytes(&bytes, HashAlgorithm::Sha1).is_err());
    }

    #[test]
    fn from_bytes_bad_magic() {
        let (_, idx) = build(1);
        let mut bytes = idx.to_bytes();
        bytes[0..4].copy_from_slice(b"BADM");
        let err = PackIndex::from_bytes(&bytes, HashAlgorithm::Sha1).unwrap_err();
        assert!(matches!(err, PackError::InvalidMagic { .. }));
    }

    #[test]
    fn from_bytes_bad_version() {
        let (_, idx) = build(1);
        let mut bytes = idx.to_bytes();
        bytes[4..8].copy_from_slice(&99u32.to_be_bytes());
        let err = PackIndex::from_bytes(&bytes, HashAlgorithm::Sha1).unwrap_err();
        assert!(matches!(err, PackError::UnsupportedVersion(99)));
    }

    #[test]
    fn from_bytes_truncated() {
        let err = PackIndex::from_bytes(b"\xfftOc", HashAlgorithm::Sha1).unwrap_err();
        assert!(matches!(err, PackError::IndexCorrupted(_)));
    }

    #[test]
    fn from_bytes_detects_flipped_bit() {
        let (_, idx) = build(5);
        let mut bytes = idx.to_bytes();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0x01;
        let err = PackIndex::from_bytes(&bytes, HashAlgorithm::Sha1).unwrap_err();
        assert!(matches!(err, PackError::ChecksumMismatch { .. }));
    }
}
