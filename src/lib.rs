//! arrayfile library
//!
//! Append-only binary files holding sequences of same-typed, same-shaped
//! numeric arrays, with random access by index.

pub mod binfile;
pub mod commands;
pub mod config;
pub mod utils;

pub use binfile::{
    ArrayFile, ArrayRecord, Element, ElementType, FileHeader, MappedArrayFile, OpenMode,
    RecordSource, TypedArray,
};
pub use config::StoreConfig;
pub use utils::{ArrayFileError, ErrorKind, Result};
