//! Array file header
//!
//! Fixed-size metadata block at offset 0 of every array file. All fields are
//! little-endian and packed:
//!
//! | offset | size | field                                  |
//! |-------:|-----:|----------------------------------------|
//! | 0      | 4    | magic (`0xA77AF001`)                   |
//! | 4      | 4    | format version                         |
//! | 8      | 1    | element type tag                       |
//! | 9      | 1    | dimension count                        |
//! | 10     | 6    | reserved                               |
//! | 16     | 32   | extents, `u64` x `MAX_DIMENSIONS`      |
//! | 48     | 8    | sample count                           |
//! | 56     | 8    | reserved                               |
//!
//! Records follow the header back to back, so the offset of record `i` is
//! `HEADER_SIZE + i * record_byte_size`.

use super::element::ElementType;
use crate::utils::HeaderError;

/// Array file magic number to identify valid files
pub const ARRAY_FILE_MAGIC: u32 = 0xA77AF001;

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// Maximum number of dimensions per record (part of format version 1)
pub const MAX_DIMENSIONS: usize = 4;

/// Header size in bytes
pub const HEADER_SIZE: usize = 64;

const TYPE_OFFSET: usize = 8;
const NDIM_OFFSET: usize = 9;
const SHAPE_OFFSET: usize = 16;
/// Byte offset of the sample count, rewritten on every append
pub const SAMPLE_COUNT_OFFSET: usize = 48;

/// In-memory view of the header block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    element_type: ElementType,
    n_dimensions: usize,
    shape: [usize; MAX_DIMENSIONS],
    n_samples: u64,
    /// Cached `product(shape)`, validated not to overflow
    n_elements: usize,
}

impl FileHeader {
    /// Create a header for records of `element_type` and `shape`
    ///
    /// The sample count starts at 0. Fails if the shape has no dimensions,
    /// more than `MAX_DIMENSIONS`, a zero extent, or a record size that
    /// does not fit in memory.
    pub fn initialize(element_type: ElementType, shape: &[usize]) -> Result<Self, HeaderError> {
        if shape.is_empty() || shape.len() > MAX_DIMENSIONS {
            return Err(HeaderError::InvalidDimensionCount {
                count: shape.len(),
                max: MAX_DIMENSIONS,
            });
        }

        let mut fixed = [0usize; MAX_DIMENSIONS];
        for (axis, &extent) in shape.iter().enumerate() {
            if extent == 0 {
                return Err(HeaderError::InvalidExtent {
                    axis,
                    extent: extent as u64,
                });
            }
            fixed[axis] = extent;
        }

        let n_elements = shape
            .iter()
            .try_fold(1usize, |acc, &extent| acc.checked_mul(extent))
            .and_then(|n| n.checked_mul(element_type.element_size()).map(|_| n))
            .ok_or_else(|| HeaderError::Overflow(format!("{:?} x {}", shape, element_type)))?;

        Ok(Self {
            element_type,
            n_dimensions: shape.len(),
            shape: fixed,
            n_samples: 0,
            n_elements,
        })
    }

    // === Accessors ===

    #[inline]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    #[inline]
    pub fn n_dimensions(&self) -> usize {
        self.n_dimensions
    }

    /// Per-axis extents, `n_dimensions` long
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape[..self.n_dimensions]
    }

    /// Extent along `axis`, `None` past the last dimension
    #[inline]
    pub fn dimension_size(&self, axis: usize) -> Option<usize> {
        self.shape().get(axis).copied()
    }

    #[inline]
    pub fn n_samples(&self) -> u64 {
        self.n_samples
    }

    /// Number of elements per record (product of the shape)
    #[inline]
    pub fn element_count(&self) -> usize {
        self.n_elements
    }

    /// Record size in bytes
    #[inline]
    pub fn record_byte_size(&self) -> usize {
        self.n_elements * self.element_type.element_size()
    }

    /// Byte offset of record `index`; fails if it does not fit in a `u64`
    #[inline]
    pub fn offset_of(&self, index: u64) -> Result<u64, HeaderError> {
        record_offset(self.record_byte_size(), index)
    }

    /// Expected file length for the current sample count
    #[inline]
    pub fn file_len(&self) -> Result<u64, HeaderError> {
        self.offset_of(self.n_samples)
    }

    /// Count one more appended record
    ///
    /// Must be called exactly once per record written. Fails, leaving the
    /// count unchanged, if the grown file would be addressable past `u64`.
    pub fn increment_sample_count(&mut self) -> Result<(), HeaderError> {
        let next = self
            .n_samples
            .checked_add(1)
            .ok_or_else(|| HeaderError::Overflow("sample count".to_string()))?;
        record_offset(self.record_byte_size(), next)?;
        self.n_samples = next;
        Ok(())
    }

    // === Codec ===

    /// Encode into the fixed-size on-disk block
    pub fn serialize(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&ARRAY_FILE_MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf[TYPE_OFFSET] = self.element_type.to_u8();
        buf[NDIM_OFFSET] = self.n_dimensions as u8;
        for (axis, &extent) in self.shape().iter().enumerate() {
            let at = SHAPE_OFFSET + axis * 8;
            buf[at..at + 8].copy_from_slice(&(extent as u64).to_le_bytes());
        }
        buf[SAMPLE_COUNT_OFFSET..SAMPLE_COUNT_OFFSET + 8]
            .copy_from_slice(&self.n_samples.to_le_bytes());
        buf
    }

    /// Encoded sample count, for in-place updates at `SAMPLE_COUNT_OFFSET`
    pub fn sample_count_bytes(&self) -> [u8; 8] {
        self.n_samples.to_le_bytes()
    }

    /// Decode the on-disk block
    pub fn deserialize(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_SIZE {
            return Err(HeaderError::Truncated {
                size: bytes.len() as u64,
                minimum: HEADER_SIZE as u64,
            });
        }

        let magic = read_u32(bytes, 0);
        if magic != ARRAY_FILE_MAGIC {
            return Err(HeaderError::InvalidMagic {
                expected: ARRAY_FILE_MAGIC,
                actual: magic,
            });
        }

        let version = read_u32(bytes, 4);
        if version != FORMAT_VERSION {
            return Err(HeaderError::UnsupportedVersion(version));
        }

        let tag = bytes[TYPE_OFFSET];
        let element_type =
            ElementType::from_u8(tag).ok_or(HeaderError::UnknownElementType(tag))?;

        let n_dimensions = bytes[NDIM_OFFSET] as usize;
        if n_dimensions == 0 || n_dimensions > MAX_DIMENSIONS {
            return Err(HeaderError::InvalidDimensionCount {
                count: n_dimensions,
                max: MAX_DIMENSIONS,
            });
        }

        let mut shape = Vec::with_capacity(n_dimensions);
        for axis in 0..n_dimensions {
            let extent = read_u64(bytes, SHAPE_OFFSET + axis * 8);
            if extent == 0 {
                return Err(HeaderError::InvalidExtent { axis, extent });
            }
            let extent = usize::try_from(extent)
                .map_err(|_| HeaderError::Overflow(format!("extent {}", extent)))?;
            shape.push(extent);
        }

        let mut header = Self::initialize(element_type, &shape)?;
        let n_samples = read_u64(bytes, SAMPLE_COUNT_OFFSET);
        record_offset(header.record_byte_size(), n_samples)?;
        header.n_samples = n_samples;
        Ok(header)
    }
}

fn record_offset(record_byte_size: usize, index: u64) -> Result<u64, HeaderError> {
    index
        .checked_mul(record_byte_size as u64)
        .and_then(|bytes| bytes.checked_add(HEADER_SIZE as u64))
        .ok_or_else(|| {
            HeaderError::Overflow(format!("record {} of {} bytes", index, record_byte_size))
        })
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry() {
        let header = FileHeader::initialize(ElementType::Int32, &[2, 3]).unwrap();
        assert_eq!(header.n_dimensions(), 2);
        assert_eq!(header.shape(), &[2, 3]);
        assert_eq!(header.element_count(), 6);
        assert_eq!(header.record_byte_size(), 24);
        assert_eq!(header.n_samples(), 0);

        assert_eq!(header.offset_of(0), Ok(HEADER_SIZE as u64));
        assert_eq!(header.offset_of(3), Ok(HEADER_SIZE as u64 + 72));
        assert!(matches!(header.offset_of(u64::MAX), Err(HeaderError::Overflow(_))));
        assert_eq!(header.dimension_size(1), Some(3));
        assert_eq!(header.dimension_size(2), None);
    }

    #[test]
    fn test_initialize_rejects_bad_shapes() {
        assert_eq!(
            FileHeader::initialize(ElementType::Float64, &[]),
            Err(HeaderError::InvalidDimensionCount { count: 0, max: 4 })
        );
        assert_eq!(
            FileHeader::initialize(ElementType::Float64, &[1, 1, 1, 1, 1]),
            Err(HeaderError::InvalidDimensionCount { count: 5, max: 4 })
        );
        assert_eq!(
            FileHeader::initialize(ElementType::Float64, &[4, 0]),
            Err(HeaderError::InvalidExtent { axis: 1, extent: 0 })
        );
        assert!(matches!(
            FileHeader::initialize(ElementType::Float64, &[usize::MAX, 2]),
            Err(HeaderError::Overflow(_))
        ));
    }

    #[test]
    fn test_serialize_layout() {
        let mut header = FileHeader::initialize(ElementType::Float64, &[3]).unwrap();
        header.increment_sample_count().unwrap();
        let bytes = header.serialize();

        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], &ARRAY_FILE_MAGIC.to_le_bytes());
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(bytes[8], ElementType::Float64.to_u8());
        assert_eq!(bytes[9], 1);
        assert_eq!(&bytes[16..24], &3u64.to_le_bytes());
        assert!(bytes[24..48].iter().all(|&b| b == 0));
        assert_eq!(&bytes[48..56], &1u64.to_le_bytes());
        assert_eq!(header.sample_count_bytes(), 1u64.to_le_bytes());
    }

    #[test]
    fn test_deserialize_restores_header() {
        let mut header = FileHeader::initialize(ElementType::Complex64, &[2, 2, 5]).unwrap();
        for _ in 0..7 {
            header.increment_sample_count().unwrap();
        }
        let decoded = FileHeader::deserialize(&header.serialize()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.n_samples(), 7);
        assert_eq!(decoded.file_len(), Ok(HEADER_SIZE as u64 + 7 * 20 * 8));
    }

    #[test]
    fn test_deserialize_rejects_corruption() {
        let good = FileHeader::initialize(ElementType::UInt8, &[4]).unwrap().serialize();

        assert!(matches!(
            FileHeader::deserialize(&good[..32]),
            Err(HeaderError::Truncated { size: 32, .. })
        ));

        let mut bad = good;
        bad[0] ^= 0xFF;
        assert!(matches!(
            FileHeader::deserialize(&bad),
            Err(HeaderError::InvalidMagic { .. })
        ));

        let mut bad = good;
        bad[4] = 2;
        assert_eq!(
            FileHeader::deserialize(&bad),
            Err(HeaderError::UnsupportedVersion(2))
        );

        let mut bad = good;
        bad[8] = 0;
        assert_eq!(
            FileHeader::deserialize(&bad),
            Err(HeaderError::UnknownElementType(0))
        );

        let mut bad = good;
        bad[9] = 5;
        assert!(matches!(
            FileHeader::deserialize(&bad),
            Err(HeaderError::InvalidDimensionCount { count: 5, .. })
        ));

        let mut bad = good;
        bad[16..24].copy_from_slice(&0u64.to_le_bytes());
        assert_eq!(
            FileHeader::deserialize(&bad),
            Err(HeaderError::InvalidExtent { axis: 0, extent: 0 })
        );
    }

    #[test]
    fn test_deserialize_rejects_unaddressable_sample_count() {
        // One [4] int32 record: 16 bytes per record
        let good = FileHeader::initialize(ElementType::Int32, &[4]).unwrap().serialize();

        for forged in [u64::MAX, 1u64 << 60] {
            let mut bad = good;
            bad[48..56].copy_from_slice(&forged.to_le_bytes());
            assert!(matches!(
                FileHeader::deserialize(&bad),
                Err(HeaderError::Overflow(_))
            ));
        }

        // Largest count whose end offset still fits
        let mut edge = good;
        let max = (u64::MAX - HEADER_SIZE as u64) / 16;
        edge[48..56].copy_from_slice(&max.to_le_bytes());
        let mut header = FileHeader::deserialize(&edge).unwrap();
        assert_eq!(header.file_len(), Ok(HEADER_SIZE as u64 + max * 16));

        assert!(matches!(
            header.increment_sample_count(),
            Err(HeaderError::Overflow(_))
        ));
        assert_eq!(header.n_samples(), max);
    }
}
