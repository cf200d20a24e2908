use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use mempack_crypto::StreamHasher;
use mempack_store::{MemPack, OdbBackend, StoreError, StoredObject};
use mempack_types::{HashAlgorithm, ObjectId};
use tracing::debug;

use crate::entry::{encode_pack_header, EntryHeader, PACK_HEADER_LEN};
use crate::error::{PackError, PackResult};
use crate::index::PackIndex;
use crate::options::PackOptions;

/// Result of flushing a pack to disk.
#[derive(Clone, Debug)]
pub struct PackFile {
    pub pack_path: PathBuf,
    pub index_path: PathBuf,
    pub object_count: usize,
    pub checksum: ObjectId,
}

/// Serializes a store's objects into a pack stream.
#[derive(Clone, Debug, Default)]
pub struct PackEncoder {
    options: PackOptions,
}

impl PackEncoder {
    pub fn new(options: PackOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PackOptions {
        &self.options
    }

    /// Encode every object currently in `store` into `sink`.
    ///
    /// The object set is fixed by a snapshot taken up front; writes that land
    /// afterwards are not included. Entries appear in insertion order. A
    /// failing sink aborts the encode with [`PackError::Unwritable`].
    pub fn encode<W: Write>(&self, store: &MemPack, sink: W) -> PackResult<PackIndex> {
        if store.algorithm() != self.options.algorithm {
            return Err(StoreError::AlgorithmMismatch {
                expected: self.options.algorithm,
                actual: store.algorithm(),
            }
            .into());
        }
        let objects = store.snapshot()?;
        self.encode_objects(&objects, sink)
    }

    /// Encode an explicit object list. Repeated ids are written once.
    pub fn encode_objects<W: Write>(
        &self,
        objects: &[StoredObject],
        sink: W,
    ) -> PackResult<PackIndex> {
        let algorithm = self.options.algorithm;
        if let Some(other) = objects.iter().find(|o| o.id.algorithm() != algorithm) {
            return Err(StoreError::AlgorithmMismatch {
                expected: algorithm,
                actual: other.id.algorithm(),
            }
            .into());
        }

        let mut seen = HashSet::with_capacity(objects.len());
        let unique: Vec<&StoredObject> = objects.iter().filter(|o| seen.insert(o.id)).collect();
        let count =
            u32::try_from(unique.len()).map_err(|_| PackError::TooManyObjects(unique.len()))?;

        let mut sink = HashingSink::new(sink, algorithm);
        let mut header = Vec::with_capacity(PACK_HEADER_LEN);
        encode_pack_header(&mut header, count);
        sink.emit(&header)?;

        let codec = self.options.codec;
        let level = self.options.level();
        let mut entries = Vec::with_capacity(unique.len());
        let mut entry = Vec::new();
        for object in unique {
            let offset = sink.written;
            entry.clear();
            EntryHeader::new(object.kind, object.size()).encode(&mut entry);
            entry.extend_from_slice(&codec.compress(&object.data, level)?);
            let crc = crc32fast::hash(&entry);
            sink.emit(&entry)?;
            entries.push((object.id, crc, offset));
        }

        let (checksum, total) = sink.finish()?;
        debug!(objects = count, bytes = total, %codec, %checksum, "encoded pack");
        Ok(PackIndex::build(entries, checksum))
    }

    /// Encode `store` into memory, returning the stream and its index.
    pub fn encode_to_vec(&self, store: &MemPack) -> PackResult<(Vec<u8>, PackIndex)> {
        let mut buf = Vec::new();
        let index = self.encode(store, &mut buf)?;
        Ok((buf, index))
    }

    /// Flush `store` to `dir` as `pack-<checksum>.pack` plus its `.idx`.
    ///
    /// This is the only operation in the crate that touches the filesystem.
    pub fn write_files(&self, store: &MemPack, dir: &Path) -> PackResult<PackFile> {
        let (pack_data, index) = self.encode_to_vec(store)?;

        std::fs::create_dir_all(dir)?;
        let base = dir.join(format!("pack-{}", index.pack_checksum.to_hex()));
        let pack_path = base.with_extension("pack");
        let index_path = base.with_extension("idx");

        std::fs::write(&pack_path, &pack_data)?;
        std::fs::write(&index_path, index.to_bytes())?;
        debug!(path = %pack_path.display(), objects = index.object_count(), "wrote pack files");

        Ok(PackFile {
            pack_path,
            index_path,
            object_count: index.object_count(),
            checksum: index.pack_checksum,
        })
    }
}

/// Sink wrapper that digests and counts every byte it forwards.
struct HashingSink<W> {
    inner: W,
    hasher: StreamHasher,
    written: u64,
}

impl<W: Write> HashingSink<W> {
    fn new(inner: W, algorithm: HashAlgorithm) -> Self {
        Self {
            inner,
            hasher: StreamHasher::new(algorithm),
            written: 0,
        }
    }

    fn emit(&mut self, bytes: &[u8]) -> PackResult<()> {
        self.inner.write_all(bytes).map_err(PackError::Unwritable)?;
        self.hasher.update(bytes);
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Append the trailer digest and flush. Returns the digest and the total
    /// stream length.
    fn finish(self) -> PackResult<(ObjectId, u64)> {
        let Self {
            mut inner,
            hasher,
            written,
        } = self;
        let checksum = hasher.finalize();
        inner
            .write_all(checksum.as_bytes())
            .map_err(PackError::Unwritable)?;
        inner.flush().map_err(PackError::Unwritable)?;
        Ok((checksum, written + checksum.as_bytes().len() as u64))
    }
}
