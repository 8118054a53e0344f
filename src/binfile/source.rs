//! Abstract record sources
//!
//! Both the read/write [`ArrayFile`](super::ArrayFile) and the read-only
//! [`MappedArrayFile`](super::MappedArrayFile) hand out records by index.
//! Consumers that only read (dumping, copying, converting) take a
//! `RecordSource` and work with either.

use std::borrow::Cow;

use super::header::FileHeader;
use super::record::ArrayRecord;
use crate::utils::{ArrayFileError, Result};

/// Indexed access to fixed-size records
pub trait RecordSource {
    /// Header describing every record
    fn header(&self) -> Result<&FileHeader>;

    /// Raw bytes of record `index`; borrowed when the source allows it
    fn record_bytes(&self, index: u64) -> Result<Cow<'_, [u8]>>;

    /// Number of records available
    fn num_records(&self) -> Result<u64> {
        Ok(self.header()?.n_samples())
    }

    /// Record byte length (fixed size per record)
    fn record_byte_len(&self) -> Result<usize> {
        Ok(self.header()?.record_byte_size())
    }

    /// Record `index` as an owned [`ArrayRecord`]
    fn record(&self, index: u64) -> Result<ArrayRecord> {
        let header = self.header()?;
        let bytes = self.record_bytes(index)?.into_owned();
        ArrayRecord::new(header.element_type(), header.shape().to_vec(), bytes)
    }
}

/// Fail with `IndexOutOfRange` unless `index < header.n_samples()`
pub(crate) fn check_index(header: &FileHeader, index: u64) -> Result<()> {
    if index >= header.n_samples() {
        return Err(ArrayFileError::IndexOutOfRange {
            index,
            len: header.n_samples(),
        });
    }
    Ok(())
}
