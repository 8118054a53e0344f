//! Utility modules

pub mod error;

pub use error::{ArrayFileError, ErrorKind, HeaderError, Result};
