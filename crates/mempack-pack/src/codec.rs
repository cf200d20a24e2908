use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use serde::{Deserialize, Serialize};

use crate::error::{PackError, PackResult};

/// How entry payloads are encoded inside a pack stream.
///
/// The codec is not recorded in the stream; encoder and decoder must agree
/// on it through their [`PackOptions`](crate::PackOptions).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackCodec {
    /// zlib streams, as git writes them.
    #[default]
    Zlib,
    /// One zstd frame per entry.
    Zstd,
    /// Payload bytes stored verbatim.
    Raw,
}

impl PackCodec {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Zlib => "zlib",
            Self::Zstd => "zstd",
            Self::Raw => "raw",
        }
    }

    /// Level used when none is configured.
    pub const fn default_level(self) -> i32 {
        match self {
            Self::Zlib => 6,
            Self::Zstd => 3,
            Self::Raw => 0,
        }
    }

    /// Encode one payload.
    pub fn compress(self, data: &[u8], level: i32) -> PackResult<Vec<u8>> {
        match self {
            Self::Zlib => {
                let level = level.clamp(0, 9) as u32;
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
                encoder
                    .write_all(data)
                    .map_err(|e| PackError::Compression(e.to_string()))?;
                encoder
                    .finish()
                    .map_err(|e| PackError::Compression(e.to_string()))
            }
            Self::Zstd => {
                zstd::encode_all(data, level).map_err(|e| PackError::Compression(e.to_string()))
            }
            Self::Raw => Ok(data.to_vec()),
        }
    }

    /// Decode one payload from the front of `input`.
    ///
    /// `size` is the uncompressed size declared by the entry header; output of
    /// any other length is an error. Returns the payload and the number of
    /// input bytes the encoded form occupied, which locates the next entry.
    pub fn decompress(self, input: &[u8], size: usize) -> PackResult<(Vec<u8>, usize)> {
        match self {
            Self::Zlib => inflate(input, size),
            Self::Zstd => {
                let frame_len = zstd::zstd_safe::find_frame_compressed_size(input).map_err(|code| {
                    PackError::Decompression(format!(
                        "no complete zstd frame: {}",
                        zstd::zstd_safe::get_error_name(code)
                    ))
                })?;
                let data = zstd::decode_all(&input[..frame_len])
                    .map_err(|e| PackError::Decompression(e.to_string()))?;
                check_len(&data, size)?;
                Ok((data, frame_len))
            }
            Self::Raw => {
                let data = input
                    .get(..size)
                    .ok_or_else(|| PackError::Decompression("raw payload truncated".into()))?;
                Ok((data.to_vec(), size))
            }
        }
    }
}

impl std::fmt::Display for PackCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for PackCodec {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zlib" => Ok(Self::Zlib),
            "zstd" => Ok(Self::Zstd),
            "raw" => Ok(Self::Raw),
            other => Err(PackError::InvalidOptions(format!("unknown codec: {other}"))),
        }
    }
}

/// Largest single output allocation made while inflating.
const INFLATE_CHUNK: usize = 1 << 20;

fn inflate(input: &[u8], size: usize) -> PackResult<(Vec<u8>, usize)> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(size.min(INFLATE_CHUNK) + 1);
    loop {
        if out.len() == out.capacity() {
            // Grow toward size + 1 so an over-long stream shows up as len > size.
            out.reserve((size.saturating_add(1) - out.len()).min(INFLATE_CHUNK));
        }
        let consumed = inflater.total_in() as usize;
        let produced = out.len();
        let status = inflater
            .decompress_vec(&input[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|e| PackError::Decompression(e.to_string()))?;
        if out.len() > size {
            return Err(PackError::Decompression(format!(
                "payload inflates past declared size {size}"
            )));
        }
        if status == Status::StreamEnd {
            break;
        }
        if inflater.total_in() as usize == consumed && out.len() == produced {
            return Err(PackError::Decompression("truncated zlib stream".into()));
        }
    }
    check_len(&out, size)?;
    Ok((out, inflater.total_in() as usize))
}

fn check_len(data: &[u8], size: usize) -> PackResult<()> {
    if data.len() != size {
        return Err(PackError::Decompression(format!(
            "size mismatch: expected {size}, got {}",
            data.len()
        )));
    }
    Ok(())
}
