use mempack_types::ObjectType;

use crate::error::{PackError, PackResult};

/// Magic bytes opening every pack stream.
pub const PACK_MAGIC: &[u8; 4] = b"PACK";

/// The only pack version this crate reads or writes.
pub const PACK_VERSION: u32 = 2;

/// Length of the fixed pack header: magic, version, object count.
pub const PACK_HEADER_LEN: usize = 12;

/// Write the 12-byte pack header.
pub fn encode_pack_header(buf: &mut Vec<u8>, object_count: u32) {
    buf.extend_from_slice(PACK_MAGIC);
    buf.extend_from_slice(&PACK_VERSION.to_be_bytes());
    buf.extend_from_slice(&object_count.to_be_bytes());
}

/// Validate the pack header and return the object count it declares.
pub fn decode_pack_header(data: &[u8]) -> PackResult<u32> {
    if data.len() < PACK_HEADER_LEN {
        return Err(PackError::CorruptEntry {
            offset: 0,
            reason: "pack data too short".into(),
        });
    }
    if &data[0..4] != PACK_MAGIC {
        return Err(PackError::InvalidMagic {
            expected: "PACK".into(),
            actual: String::from_utf8_lossy(&data[0..4]).into(),
        });
    }
    let version = read_u32(&data[4..8]);
    if version != PACK_VERSION {
        return Err(PackError::UnsupportedVersion(version));
    }
    Ok(read_u32(&data[8..12]))
}

/// Type and uncompressed size prefix of one pack entry.
///
/// The first byte carries a continuation bit (0x80), the type number in bits
/// 4-6 and the low four size bits. Each following byte carries a
/// continuation bit and seven more size bits, low-order groups first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryHeader {
    pub kind: ObjectType,
    pub size: u64,
}

impl EntryHeader {
    pub fn new(kind: ObjectType, size: u64) -> Self {
        Self { kind, size }
    }

    /// Append the encoded header to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        let mut byte = (self.kind.pack_type() << 4) | (self.size & 0x0f) as u8;
        let mut rest = self.size >> 4;
        while rest != 0 {
            buf.push(byte | 0x80);
            byte = (rest & 0x7f) as u8;
            rest >>= 7;
        }
        buf.push(byte);
    }

    /// Decode a header from the start of `data`. Returns the header and the
    /// number of bytes consumed. `offset` is only used in error reports.
    pub fn decode(data: &[u8], offset: u64) -> PackResult<(Self, usize)> {
        let corrupt = |reason: &str| PackError::CorruptEntry {
            offset,
            reason: reason.into(),
        };

        let first = *data.first().ok_or_else(|| corrupt("truncated entry header"))?;
        let type_bits = (first >> 4) & 0x07;
        let kind = ObjectType::from_pack_type(type_bits).ok_or_else(|| PackError::CorruptEntry {
            offset,
            reason: format!("unsupported entry type {type_bits}"),
        })?;

        let mut size = u64::from(first & 0x0f);
        let mut shift = 4;
        let mut pos = 1;
        let mut byte = first;
        while byte & 0x80 != 0 {
            byte = *data.get(pos).ok_or_else(|| corrupt("truncated entry header"))?;
            pos += 1;
            if shift > 60 || (shift == 60 && byte & 0x70 != 0) {
                return Err(corrupt("entry size overflows 64 bits"));
            }
            size |= u64::from(byte & 0x7f) << shift;
            shift += 7;
        }
        Ok((Self { kind, size }, pos))
    }
}

pub(crate) fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_be_bytes(buf)
}

pub(crate) fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(buf)
}
