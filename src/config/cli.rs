//! Command-line argument parsing
//!
//! Global flags control logging and how files are opened; each subcommand
//! works on one or more array files.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::binfile::ElementType;

/// Inspect, dump, concatenate and convert binary array files
#[derive(Parser, Debug, Clone)]
#[command(name = "arrayfile")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    // ===== Output Options =====
    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    // ===== Store Options =====
    /// Sync written files to disk when they are closed
    #[arg(long = "sync", global = true)]
    pub sync: bool,

    /// Keep bytes past the last complete record when appending
    #[arg(long = "keep-trailing", global = true)]
    pub keep_trailing: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the header of an array file
    Info {
        path: PathBuf,

        /// Output format
        #[arg(short = 'o', long = "output", value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Print records as text
    Dump {
        path: PathBuf,

        /// Print only this record
        #[arg(short = 'i', long = "index")]
        index: Option<u64>,

        /// Print at most this many records
        #[arg(short = 'n', long = "limit")]
        limit: Option<u64>,
    },

    /// Copy every record of the inputs into one file
    Concat {
        /// Destination file
        output: PathBuf,

        /// Source files, copied in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Append to an existing destination instead of truncating it
        #[arg(short = 'a', long = "append")]
        append: bool,
    },

    /// Rewrite a file with a different element type
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// Target element type (e.g. float32, int16, complex128)
        #[arg(short = 't', long = "to")]
        to: ElementType,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl CliArgs {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("--verbose and --quiet are mutually exclusive".to_string());
        }

        match &self.command {
            Command::Concat { output, inputs, .. } => {
                if inputs.iter().any(|input| input == output) {
                    return Err(format!("output {} cannot also be an input", output.display()));
                }
            }
            Command::Convert { input, output, .. } => {
                if input == output {
                    return Err("convert needs distinct input and output paths".to_string());
                }
            }
            Command::Dump {
                index: Some(_),
                limit: Some(_),
                ..
            } => {
                return Err("--index and --limit are mutually exclusive".to_string());
            }
            _ => {}
        }

        Ok(())
    }
}
