//! Binary array files
//!
//! An array file stores a sequence of arrays ("samples") that share one
//! element type and one shape. A fixed 64-byte header describes the type,
//! the shape and the sample count; records follow back to back, so any
//! record can be located from its index alone.

pub mod cast;
pub mod element;
pub mod header;
pub mod mapped;
pub mod mode;
pub mod record;
pub mod source;
pub mod store;

pub use cast::Scalar;
pub use element::{Element, ElementType};
pub use header::{FileHeader, ARRAY_FILE_MAGIC, FORMAT_VERSION, HEADER_SIZE, MAX_DIMENSIONS};
pub use mapped::MappedArrayFile;
pub use mode::OpenMode;
pub use record::{ArrayRecord, TypedArray};
pub use source::RecordSource;
pub use store::{ArrayFile, Records};
