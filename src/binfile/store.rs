//! Array file store
//!
//! [`ArrayFile`] owns one open file and its header. The header is fixed by
//! the first record written (or by [`ArrayFile::init`]); every later record
//! must match its element type and shape exactly. Records are appended after
//! the last one and can be read back sequentially or by index.
//!
//! A store is single-threaded: it holds one file handle and no locks. Many
//! stores opened in [`OpenMode::Read`] on the same file are independent.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::element::{Element, ElementType};
use super::header::{FileHeader, HEADER_SIZE, SAMPLE_COUNT_OFFSET};
use super::mode::OpenMode;
use super::record::{ArrayRecord, TypedArray};
use super::source::{check_index, RecordSource};
use crate::config::StoreConfig;
use crate::utils::{ArrayFileError, HeaderError, Result};

/// An array file opened in one mode
pub struct ArrayFile {
    path: PathBuf,
    mode: OpenMode,
    config: StoreConfig,
    /// `None` once closed
    file: Option<File>,
    /// `None` until the first record or an explicit `init`
    header: Option<FileHeader>,
    /// Index of the record the next `read()` returns
    read_cursor: u64,
}

impl ArrayFile {
    /// Open `path` in `mode` with default options
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        Self::open_with(path, mode, StoreConfig::default())
    }

    /// Create or truncate `path` for writing
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path, OpenMode::Write)
    }

    /// Open `path` in `mode`
    ///
    /// `Append` and `Read` load and validate the existing header; a missing
    /// file fails with `FileNotFound`, a malformed one with `CorruptHeader`.
    /// The handle is released on every error path.
    pub fn open_with<P: AsRef<Path>>(path: P, mode: OpenMode, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref();
        let mut file = mode.open_options().open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ArrayFileError::FileNotFound(path.to_path_buf())
            } else {
                ArrayFileError::Io(e)
            }
        })?;

        let header = if mode.requires_existing() {
            Some(load_header(&mut file, mode, &config)?)
        } else {
            None
        };

        debug!(
            "Opened {:?} in {} mode ({} samples)",
            path,
            mode,
            header.as_ref().map_or(0, |h| h.n_samples())
        );

        Ok(Self {
            path: path.to_path_buf(),
            mode,
            config,
            file: Some(file),
            header,
            read_cursor: 0,
        })
    }

    // === State ===

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.header.is_some()
    }

    /// Index the next sequential `read()` returns
    #[inline]
    pub fn position(&self) -> u64 {
        self.read_cursor
    }

    /// Reset the sequential cursor to the first record
    pub fn rewind(&mut self) {
        self.read_cursor = 0;
    }

    /// Header, failing with `Closed` or `Uninitialized`
    pub fn header(&self) -> Result<&FileHeader> {
        if self.file.is_none() {
            return Err(ArrayFileError::Closed);
        }
        self.header.as_ref().ok_or(ArrayFileError::Uninitialized)
    }

    // === Metadata ===

    pub fn element_type(&self) -> Result<ElementType> {
        Ok(self.header()?.element_type())
    }

    pub fn n_dimensions(&self) -> Result<usize> {
        Ok(self.header()?.n_dimensions())
    }

    pub fn shape(&self) -> Result<&[usize]> {
        Ok(self.header()?.shape())
    }

    /// Number of records stored
    pub fn n_samples(&self) -> Result<u64> {
        Ok(self.header()?.n_samples())
    }

    /// Index the next write lands at; equals `n_samples`
    pub fn next_write_index(&self) -> Result<u64> {
        self.n_samples()
    }

    /// Number of elements per record
    pub fn n_elements(&self) -> Result<usize> {
        Ok(self.header()?.element_count())
    }

    /// Extent along `axis`
    pub fn dimension_size(&self, axis: usize) -> Result<usize> {
        let header = self.header()?;
        header
            .dimension_size(axis)
            .ok_or(ArrayFileError::DimensionOutOfRange {
                axis,
                n_dimensions: header.n_dimensions(),
            })
    }

    // === Writing ===

    /// Fix the element type and shape before anything is written
    pub fn init(&mut self, element_type: ElementType, shape: &[usize]) -> Result<()> {
        self.ensure_writable()?;
        if self.header.is_some() {
            return Err(ArrayFileError::AlreadyInitialized);
        }
        let header =
            FileHeader::initialize(element_type, shape).map_err(ArrayFileError::InvalidShape)?;

        let result = match self.file.as_mut() {
            Some(file) => write_at(file, 0, &header.serialize()),
            None => return Err(ArrayFileError::Closed),
        };
        self.commit(result, 0, header)
    }

    /// Append one record
    ///
    /// The first record of a fresh file fixes the header. Later records must
    /// have the same element type and shape. A rejected record leaves the
    /// file and the store untouched.
    pub fn write(&mut self, record: &ArrayRecord) -> Result<()> {
        self.ensure_writable()?;

        let (mut next, fresh) = match &self.header {
            Some(header) => {
                check_conforms(header, record)?;
                (header.clone(), false)
            }
            None => (
                FileHeader::initialize(record.element_type(), record.shape())
                    .map_err(ArrayFileError::InvalidShape)?,
                true,
            ),
        };

        let index = next.n_samples();
        let rollback_len = if fresh {
            0
        } else {
            next.file_len().map_err(ArrayFileError::CorruptHeader)?
        };
        let offset = next.offset_of(index).map_err(ArrayFileError::CorruptHeader)?;
        next.increment_sample_count().map_err(ArrayFileError::CorruptHeader)?;

        let result = match self.file.as_mut() {
            Some(file) => append_record(file, &next, offset, record.as_bytes(), fresh),
            None => return Err(ArrayFileError::Closed),
        };
        self.commit(result, rollback_len, next)?;

        debug!("Appended record {} to {:?}", index, self.path);
        Ok(())
    }

    /// Encode `values` as a record of `shape` and append it
    pub fn write_slice<T: Element>(&mut self, shape: &[usize], values: &[T]) -> Result<()> {
        let record = ArrayRecord::from_slice(shape, values)?;
        self.write(&record)
    }

    // === Reading ===

    /// Read the record at the sequential cursor and advance it
    pub fn read(&mut self) -> Result<ArrayRecord> {
        let len = self.n_samples()?;
        if self.read_cursor >= len {
            return Err(ArrayFileError::EndOfStream { len });
        }
        let record = self.read_at(self.read_cursor)?;
        self.read_cursor += 1;
        Ok(record)
    }

    /// Read record `index` without moving the sequential cursor
    pub fn read_at(&self, index: u64) -> Result<ArrayRecord> {
        let header = self.header()?;
        let bytes = self.read_record_bytes(header, index)?;
        ArrayRecord::new(header.element_type(), header.shape().to_vec(), bytes)
    }

    /// Sequential read converted to `T`
    ///
    /// `n_dimensions` must equal the file's dimension count. Elements are
    /// converted per the table in [`cast`](super::cast).
    pub fn read_as<T: Element>(&mut self, n_dimensions: usize) -> Result<TypedArray<T>> {
        self.check_rank(n_dimensions)?;
        Ok(self.read()?.to_typed())
    }

    /// Indexed read converted to `T`
    pub fn read_at_as<T: Element>(&self, index: u64, n_dimensions: usize) -> Result<TypedArray<T>> {
        self.check_rank(n_dimensions)?;
        Ok(self.read_at(index)?.to_typed())
    }

    /// Iterate over all records by index, independent of the cursor
    pub fn records(&self) -> Result<Records<'_>> {
        let len = self.n_samples()?;
        Ok(Records {
            file: self,
            next: 0,
            len,
        })
    }

    // === Lifecycle ===

    /// Flush and release the file handle; closing twice is a no-op
    pub fn close(&mut self) -> Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        file.flush()?;
        if self.config.sync_on_close && self.mode.is_writable() {
            file.sync_all()?;
        }
        debug!("Closed {:?}", self.path);
        Ok(())
    }

    // === Internals ===

    fn ensure_writable(&self) -> Result<()> {
        if self.file.is_none() {
            return Err(ArrayFileError::Closed);
        }
        if !self.mode.is_writable() {
            return Err(ArrayFileError::ReadOnly);
        }
        Ok(())
    }

    fn check_rank(&self, requested: usize) -> Result<()> {
        let expected = self.n_dimensions()?;
        if requested != expected {
            return Err(ArrayFileError::RankMismatch {
                expected,
                requested,
            });
        }
        Ok(())
    }

    fn read_record_bytes(&self, header: &FileHeader, index: u64) -> Result<Vec<u8>> {
        check_index(header, index)?;
        let mut file: &File = self.file.as_ref().ok_or(ArrayFileError::Closed)?;
        let offset = header.offset_of(index).map_err(ArrayFileError::CorruptHeader)?;
        let mut buf = vec![0u8; header.record_byte_size()];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Adopt `next` on success; on I/O failure cut the file back to
    /// `rollback_len` and close the store
    fn commit(&mut self, result: io::Result<()>, rollback_len: u64, next: FileHeader) -> Result<()> {
        match result {
            Ok(()) => {
                if self.header.is_none() {
                    debug!(
                        "Initialized {:?}: {} {:?}",
                        self.path,
                        next.element_type(),
                        next.shape()
                    );
                }
                self.header = Some(next);
                Ok(())
            }
            Err(e) => {
                if let Some(file) = self.file.take() {
                    if let Err(cleanup) = file.set_len(rollback_len) {
                        warn!("Failed to roll back {:?}: {}", self.path, cleanup);
                    }
                }
                warn!("Write to {:?} failed, store closed: {}", self.path, e);
                Err(ArrayFileError::Io(e))
            }
        }
    }
}

impl Drop for ArrayFile {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close {:?}: {}", self.path, e);
        }
    }
}

impl RecordSource for ArrayFile {
    fn header(&self) -> Result<&FileHeader> {
        ArrayFile::header(self)
    }

    fn record_bytes(&self, index: u64) -> Result<Cow<'_, [u8]>> {
        let header = ArrayFile::header(self)?;
        Ok(Cow::Owned(self.read_record_bytes(header, index)?))
    }
}

/// Iterator over the records of an [`ArrayFile`]
pub struct Records<'a> {
    file: &'a ArrayFile,
    next: u64,
    len: u64,
}

impl Iterator for Records<'_> {
    type Item = Result<ArrayRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let item = self.file.read_at(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.len - self.next) as usize;
        (remaining, Some(remaining))
    }
}

fn check_conforms(header: &FileHeader, record: &ArrayRecord) -> Result<()> {
    if record.element_type() != header.element_type() {
        return Err(ArrayFileError::TypeMismatch {
            expected: header.element_type(),
            actual: record.element_type(),
        });
    }
    if record.shape() != header.shape() {
        return Err(ArrayFileError::ShapeMismatch {
            expected: header.shape().to_vec(),
            actual: record.shape().to_vec(),
        });
    }
    Ok(())
}

fn load_header(file: &mut File, mode: OpenMode, config: &StoreConfig) -> Result<FileHeader> {
    let size = file.metadata()?.len();
    if size < HEADER_SIZE as u64 {
        return Err(ArrayFileError::CorruptHeader(HeaderError::Truncated {
            size,
            minimum: HEADER_SIZE as u64,
        }));
    }

    let mut buf = [0u8; HEADER_SIZE];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut buf)?;
    let header = FileHeader::deserialize(&buf).map_err(ArrayFileError::CorruptHeader)?;

    let expected = header.file_len().map_err(ArrayFileError::CorruptHeader)?;
    if size < expected {
        return Err(ArrayFileError::CorruptHeader(HeaderError::Truncated {
            size,
            minimum: expected,
        }));
    }
    if size > expected && mode == OpenMode::Append && config.truncate_trailing {
        warn!(
            "Dropping {} trailing bytes past record {}",
            size - expected,
            header.n_samples()
        );
        file.set_len(expected)?;
    }
    Ok(header)
}

fn write_at<W: Write + Seek>(file: &mut W, offset: u64, bytes: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(bytes)
}

/// Write the record body, then publish it through the header
fn append_record<W: Write + Seek>(
    file: &mut W,
    next: &FileHeader,
    offset: u64,
    data: &[u8],
    fresh: bool,
) -> io::Result<()> {
    write_at(file, offset, data)?;
    if fresh {
        write_at(file, 0, &next.serialize())
    } else {
        write_at(file, SAMPLE_COUNT_OFFSET as u64, &next.sample_count_bytes())
    }
}
