//! Store configuration
//!
//! Knobs that change how an [`ArrayFile`](crate::binfile::ArrayFile) touches
//! the disk, built either programmatically or from CLI arguments.

use super::cli::CliArgs;

/// Options applied when opening an array file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Call `sync_all` when the store is closed
    pub sync_on_close: bool,

    /// On append, drop bytes past the last complete record
    pub truncate_trailing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_on_close: false,
            truncate_trailing: true,
        }
    }
}

impl StoreConfig {
    /// Build from parsed CLI arguments
    pub fn from_cli(args: &CliArgs) -> Self {
        Self {
            sync_on_close: args.sync,
            truncate_trailing: !args.keep_trailing,
        }
    }

    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    pub fn with_truncate_trailing(mut self, truncate: bool) -> Self {
        self.truncate_trailing = truncate;
        self
    }
}
