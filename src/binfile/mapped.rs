//! Memory-mapped array file
//!
//! Read-only, zero-copy view of a finished array file. The file is mapped
//! once and records are sliced straight out of the mapping, so one
//! `MappedArrayFile` can be shared across threads behind an `Arc`.
//!
//! The sample count is read at open time; records appended afterwards by a
//! writer are not visible until the file is mapped again.

use std::borrow::Cow;
use std::fs::File;
use std::io;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use super::element::ElementType;
use super::header::{FileHeader, HEADER_SIZE};
use super::source::{check_index, RecordSource};
use crate::utils::{ArrayFileError, HeaderError, Result};

/// Memory-mapped array file
pub struct MappedArrayFile {
    /// Memory-mapped file
    mmap: Mmap,
    header: FileHeader,
    /// Cached header values for the hot path
    record_byte_len: usize,
    num_records: u64,
}

impl MappedArrayFile {
    /// Open an array file and memory map it
    ///
    /// # Returns
    /// * `Ok(MappedArrayFile)` on success
    /// * `Err(ArrayFileError)` if the file is missing, cannot be mapped, or
    ///   has an invalid header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ArrayFileError::FileNotFound(path.to_path_buf()),
            _ => ArrayFileError::Io(e),
        })?;

        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(ArrayFileError::CorruptHeader(HeaderError::Truncated {
                size,
                minimum: HEADER_SIZE as u64,
            }));
        }

        // SAFETY: The file is opened read-only and we never modify the memory.
        // Writers only append past the mapped length or rewrite the sample
        // count, which is parsed once here.
        let mmap = unsafe { Mmap::map(&file) }?;

        let header = FileHeader::deserialize(&mmap[..HEADER_SIZE])
            .map_err(ArrayFileError::CorruptHeader)?;

        // Validate file size
        let expected = header.file_len().map_err(ArrayFileError::CorruptHeader)?;
        if (mmap.len() as u64) < expected {
            return Err(ArrayFileError::CorruptHeader(HeaderError::Truncated {
                size: mmap.len() as u64,
                minimum: expected,
            }));
        }

        debug!("Mapped {:?}: {} bytes", path, mmap.len());

        Ok(Self {
            record_byte_len: header.record_byte_size(),
            num_records: header.n_samples(),
            mmap,
            header,
        })
    }

    // === Accessors ===

    #[inline(always)]
    pub fn element_type(&self) -> ElementType {
        self.header.element_type()
    }

    #[inline(always)]
    pub fn shape(&self) -> &[usize] {
        self.header.shape()
    }

    #[inline(always)]
    pub fn num_records(&self) -> u64 {
        self.num_records
    }

    #[inline(always)]
    pub fn record_byte_len(&self) -> usize {
        self.record_byte_len
    }

    // === Zero-Copy Data Access ===

    /// Get raw bytes for record at index (zero-copy)
    ///
    /// # Panics
    /// Panics in debug mode if idx >= num_records
    #[inline(always)]
    pub fn get_record_bytes(&self, idx: u64) -> &[u8] {
        debug_assert!(idx < self.num_records, "record index out of bounds");
        // In range: open checked that every record lies inside the mapping
        let offset = HEADER_SIZE + idx as usize * self.record_byte_len;
        &self.mmap[offset..offset + self.record_byte_len]
    }

    /// Get record at index with bounds checking
    #[inline]
    pub fn try_get_record_bytes(&self, idx: u64) -> Option<&[u8]> {
        if idx >= self.num_records {
            return None;
        }
        Some(self.get_record_bytes(idx))
    }

    /// Get total memory mapped size in bytes
    pub fn mmap_size(&self) -> usize {
        self.mmap.len()
    }

    /// Get file summary string
    pub fn summary(&self) -> String {
        format!(
            "Array file: {} records, type={}, shape={:?}, record_size={}B",
            self.num_records,
            self.element_type(),
            self.shape(),
            self.record_byte_len
        )
    }
}

impl RecordSource for MappedArrayFile {
    fn header(&self) -> Result<&FileHeader> {
        Ok(&self.header)
    }

    fn record_bytes(&self, index: u64) -> Result<Cow<'_, [u8]>> {
        check_index(&self.header, index)?;
        Ok(Cow::Borrowed(self.get_record_bytes(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binfile::{ArrayFile, ArrayRecord};
    use crate::utils::ErrorKind;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn write_file(path: &Path, count: i64) {
        let mut store = ArrayFile::create(path).unwrap();
        for i in 0..count {
            store.write_slice(&[2], &[i, -i]).unwrap();
        }
        store.close().unwrap();
    }

    #[test]
    fn test_mapped_matches_store() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("mapped.bin");
        write_file(&path, 4);

        let mapped = MappedArrayFile::open(&path).unwrap();
        assert_eq!(mapped.num_records(), 4);
        assert_eq!(mapped.element_type(), ElementType::Int64);
        assert_eq!(mapped.shape(), &[2]);
        assert_eq!(mapped.record_byte_len(), 16);
        assert_eq!(mapped.mmap_size(), HEADER_SIZE + 4 * 16);

        let store = ArrayFile::open(&path, crate::binfile::OpenMode::Read).unwrap();
        for i in 0..4 {
            assert_eq!(mapped.record(i).unwrap(), store.read_at(i).unwrap());
        }
        assert_eq!(mapped.try_get_record_bytes(4), None);
        assert_eq!(mapped.record(4).unwrap_err().kind(), ErrorKind::IndexOutOfRange);
    }

    #[test]
    fn test_shared_across_threads() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("shared.bin");
        write_file(&path, 16);

        let mapped = Arc::new(MappedArrayFile::open(&path).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let mapped = Arc::clone(&mapped);
                thread::spawn(move || {
                    (0..16u64)
                        .filter(|i| i % 4 == t)
                        .map(|i| mapped.record(i).unwrap().to_vec::<i64>()[0])
                        .sum::<i64>()
                })
            })
            .collect();
        let total: i64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, (0..16).sum::<i64>());
    }

    #[test]
    fn test_open_errors() {
        let dir = tempdir().expect("failed to create tempdir");

        let err = MappedArrayFile::open(dir.path().join("none.bin")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);

        let empty = dir.path().join("empty.bin");
        std::fs::write(&empty, b"").unwrap();
        let err = MappedArrayFile::open(&empty).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::CorruptHeader);
    }

    #[test]
    fn test_forged_sample_count_rejected() {
        use crate::binfile::header::SAMPLE_COUNT_OFFSET;

        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("forged.bin");

        for forged in [u64::MAX, 1u64 << 60, 2] {
            write_file(&path, 1);
            let mut bytes = std::fs::read(&path).unwrap();
            bytes[SAMPLE_COUNT_OFFSET..SAMPLE_COUNT_OFFSET + 8]
                .copy_from_slice(&forged.to_le_bytes());
            std::fs::write(&path, &bytes).unwrap();

            let err = MappedArrayFile::open(&path).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::CorruptHeader);
        }
    }

    #[test]
    fn test_summary() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("summary.bin");
        let mut store = ArrayFile::create(&path).unwrap();
        store
            .write(&ArrayRecord::from_slice(&[3], &[1.0f32, 2.0, 3.0]).unwrap())
            .unwrap();
        drop(store);

        let mapped = MappedArrayFile::open(&path).unwrap();
        assert_eq!(
            mapped.summary(),
            "Array file: 1 records, type=float32, shape=[3], record_size=12B"
        );
    }
}
