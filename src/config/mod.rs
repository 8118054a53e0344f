//! Configuration module

pub mod cli;
pub mod store_config;

pub use cli::{CliArgs, Command, OutputFormat};
pub use store_config::StoreConfig;
