//! Open modes

use std::fmt;
use std::fs::OpenOptions;

/// How an array file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create or truncate; records written can be read back
    Write,
    /// Open an existing file and keep appending to it
    Append,
    /// Open an existing file read-only
    Read,
}

impl OpenMode {
    #[inline]
    pub fn is_writable(&self) -> bool {
        !matches!(self, OpenMode::Read)
    }

    /// Whether the file must already exist and carry a header
    #[inline]
    pub fn requires_existing(&self) -> bool {
        !matches!(self, OpenMode::Write)
    }

    pub(crate) fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(true);
        match self {
            OpenMode::Write => {
                options.write(true).create(true).truncate(true);
            }
            OpenMode::Append => {
                options.write(true);
            }
            OpenMode::Read => {}
        }
        options
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OpenMode::Write => "write",
            OpenMode::Append => "append",
            OpenMode::Read => "read",
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
