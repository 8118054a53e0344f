//! Error types for arrayfile

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::binfile::element::ElementType;

/// Header codec errors
///
/// Produced by [`FileHeader`](crate::binfile::FileHeader) when decoding the
/// on-disk block or when initializing a header from a type and shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Invalid magic: expected 0x{expected:08X}, got 0x{actual:08X}")]
    InvalidMagic { expected: u32, actual: u32 },

    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    #[error("Unknown element type tag: {0}")]
    UnknownElementType(u8),

    #[error("Invalid dimension count {count} (supported: 1..={max})")]
    InvalidDimensionCount { count: usize, max: usize },

    #[error("Extent along dimension {axis} must be positive, got {extent}")]
    InvalidExtent { axis: usize, extent: u64 },

    #[error("Header block too short: {size} bytes, need {minimum}")]
    Truncated { size: u64, minimum: u64 },

    #[error("Record geometry overflows: {0}")]
    Overflow(String),
}

/// Error category, one per failure class of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Uninitialized,
    AlreadyInitialized,
    CorruptHeader,
    InvalidShape,
    TypeMismatch,
    ShapeMismatch,
    IndexOutOfRange,
    FileNotFound,
    InvalidMode,
    Closed,
    IoFailure,
}

/// Array file store errors
#[derive(Error, Debug)]
pub enum ArrayFileError {
    #[error("Header not initialized: nothing has been written yet")]
    Uninitialized,

    #[error("Header already initialized")]
    AlreadyInitialized,

    #[error("Corrupt header: {0}")]
    CorruptHeader(HeaderError),

    #[error("Invalid shape: {0}")]
    InvalidShape(HeaderError),

    #[error("Element type mismatch: file holds {expected}, got {actual}")]
    TypeMismatch {
        expected: ElementType,
        actual: ElementType,
    },

    #[error("Shape mismatch: file holds {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Dimension count mismatch: file holds {expected}, requested {requested}")]
    RankMismatch { expected: usize, requested: usize },

    #[error("Buffer holds {actual} bytes, shape and type require {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Index {index} out of range (sample count {len})")]
    IndexOutOfRange { index: u64, len: u64 },

    #[error("Dimension {axis} out of range ({n_dimensions} dimensions)")]
    DimensionOutOfRange { axis: usize, n_dimensions: usize },

    #[error("End of stream after {len} samples")]
    EndOfStream { len: u64 },

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Store is opened read-only")]
    ReadOnly,

    #[error("Store is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ArrayFileError {
    /// Map this error onto its failure class
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArrayFileError::Uninitialized => ErrorKind::Uninitialized,
            ArrayFileError::AlreadyInitialized => ErrorKind::AlreadyInitialized,
            ArrayFileError::CorruptHeader(_) => ErrorKind::CorruptHeader,
            ArrayFileError::InvalidShape(_) => ErrorKind::InvalidShape,
            ArrayFileError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ArrayFileError::ShapeMismatch { .. }
            | ArrayFileError::RankMismatch { .. }
            | ArrayFileError::BufferSizeMismatch { .. } => ErrorKind::ShapeMismatch,
            ArrayFileError::IndexOutOfRange { .. }
            | ArrayFileError::DimensionOutOfRange { .. }
            | ArrayFileError::EndOfStream { .. } => ErrorKind::IndexOutOfRange,
            ArrayFileError::FileNotFound(_) => ErrorKind::FileNotFound,
            ArrayFileError::ReadOnly => ErrorKind::InvalidMode,
            ArrayFileError::Closed => ErrorKind::Closed,
            ArrayFileError::Io(_) => ErrorKind::IoFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArrayFileError>;
