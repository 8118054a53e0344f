//! Subcommand implementations
//!
//! Each command reads its inputs through [`MappedArrayFile`] and writes
//! through [`ArrayFile`], so the binary exercises both access paths.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::Serialize;
use tracing::info;

use crate::binfile::element::dispatch_element;
use crate::binfile::{
    ArrayFile, ArrayRecord, ElementType, FileHeader, MappedArrayFile, OpenMode, RecordSource,
};
use crate::config::{CliArgs, Command, OutputFormat, StoreConfig};
use crate::utils::ArrayFileError;

/// Header summary printed by `info`
#[derive(Debug, Clone, Serialize)]
pub struct HeaderSummary {
    pub path: PathBuf,
    pub element_type: ElementType,
    pub n_dimensions: usize,
    pub shape: Vec<usize>,
    pub n_samples: u64,
    pub elements_per_record: usize,
    pub record_byte_size: usize,
    pub file_size: usize,
}

impl HeaderSummary {
    pub fn from_file(path: &Path, file: &MappedArrayFile) -> Result<Self> {
        let header = file.header()?;
        Ok(Self {
            path: path.to_path_buf(),
            element_type: header.element_type(),
            n_dimensions: header.n_dimensions(),
            shape: header.shape().to_vec(),
            n_samples: header.n_samples(),
            elements_per_record: header.element_count(),
            record_byte_size: header.record_byte_size(),
            file_size: file.mmap_size(),
        })
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(format!(
                "File:         {}\n\
                 Element type: {}\n\
                 Dimensions:   {}\n\
                 Shape:        {:?}\n\
                 Samples:      {}\n\
                 Elements:     {} per record\n\
                 Record size:  {} bytes\n\
                 File size:    {} bytes",
                self.path.display(),
                self.element_type,
                self.n_dimensions,
                self.shape,
                self.n_samples,
                self.elements_per_record,
                self.record_byte_size,
                self.file_size
            )),
        }
    }
}

/// Dispatch parsed arguments to a command, writing output to `out`
pub fn run<W: Write>(args: &CliArgs, out: &mut W) -> Result<()> {
    let config = StoreConfig::from_cli(args);

    match &args.command {
        Command::Info { path, output } => {
            let file = MappedArrayFile::open(path)
                .map_err(|e| anyhow!("Failed to open {}: {}", path.display(), e))?;
            let summary = HeaderSummary::from_file(path, &file)?;
            writeln!(out, "{}", summary.render(*output)?)?;
        }
        Command::Dump { path, index, limit } => {
            let file = MappedArrayFile::open(path)
                .map_err(|e| anyhow!("Failed to open {}: {}", path.display(), e))?;
            dump(&file, *index, *limit, out)?;
        }
        Command::Concat {
            output,
            inputs,
            append,
        } => {
            let copied = concat(output, inputs, *append, config)?;
            info!("Wrote {} records to {}", copied, output.display());
        }
        Command::Convert { input, output, to } => {
            let converted = convert(input, output, *to, config)?;
            info!(
                "Converted {} records of {} to {}",
                converted,
                input.display(),
                to
            );
        }
    }

    Ok(())
}

/// Print records one per line as `[index] v0 v1 ...`
pub fn dump<W: Write>(
    source: &dyn RecordSource,
    index: Option<u64>,
    limit: Option<u64>,
    out: &mut W,
) -> Result<()> {
    if let Some(i) = index {
        // Out-of-range indices fail here with IndexOutOfRange
        let record = source.record(i)?;
        writeln!(out, "[{}] {}", i, format_elements(&record))?;
        return Ok(());
    }

    let total = source.num_records()?;
    for i in 0..limit.map_or(total, |n| n.min(total)) {
        let record = source.record(i)?;
        writeln!(out, "[{}] {}", i, format_elements(&record))?;
    }
    Ok(())
}

/// Copy every record of `inputs` into `output`, returning the count copied
///
/// Every input is opened and checked against the first before `output` is
/// touched, so a missing or mismatched input leaves it as it was.
pub fn concat(
    output: &Path,
    inputs: &[PathBuf],
    append: bool,
    config: StoreConfig,
) -> Result<u64> {
    let sources = inputs
        .iter()
        .map(|input| {
            MappedArrayFile::open(input)
                .map_err(|e| anyhow!("Failed to open {}: {}", input.display(), e))
        })
        .collect::<Result<Vec<_>>>()?;
    let Some(first) = sources.first() else {
        return Err(anyhow!("concat needs at least one input"));
    };
    for (input, source) in inputs.iter().zip(&sources) {
        check_same_layout(first.header()?, source.header()?)
            .map_err(|e| anyhow!("Cannot concatenate {}: {}", input.display(), e))?;
    }

    let mode = if append && output.exists() {
        OpenMode::Append
    } else {
        OpenMode::Write
    };
    let mut dest = ArrayFile::open_with(output, mode, config)?;
    if dest.is_initialized() {
        check_same_layout(dest.header()?, first.header()?)
            .map_err(|e| anyhow!("Cannot append to {}: {}", output.display(), e))?;
    }

    let mut copied = 0;
    for (input, source) in inputs.iter().zip(&sources) {
        copied += copy_records(source, &mut dest, None)
            .map_err(|e| anyhow!("Failed to copy {}: {}", input.display(), e))?;
    }

    dest.close()?;
    Ok(copied)
}

/// Rewrite `input` as `output` with every element converted to `to`
pub fn convert(input: &Path, output: &Path, to: ElementType, config: StoreConfig) -> Result<u64> {
    let source = MappedArrayFile::open(input)
        .map_err(|e| anyhow!("Failed to open {}: {}", input.display(), e))?;
    let mut dest = ArrayFile::open_with(output, OpenMode::Write, config)?;

    // Keep the geometry even when there is nothing to convert
    dest.init(to, source.shape())?;
    let converted = copy_records(&source, &mut dest, Some(to))?;

    dest.close()?;
    Ok(converted)
}

/// Append every record of `source` to `dest`, optionally converting
pub fn copy_records(
    source: &dyn RecordSource,
    dest: &mut ArrayFile,
    cast_to: Option<ElementType>,
) -> crate::utils::Result<u64> {
    let total = source.num_records()?;
    for i in 0..total {
        let record = source.record(i)?;
        match cast_to {
            Some(to) if to != record.element_type() => dest.write(&record.cast(to))?,
            _ => dest.write(&record)?,
        }
    }
    Ok(total)
}

fn check_same_layout(expected: &FileHeader, actual: &FileHeader) -> crate::utils::Result<()> {
    if actual.element_type() != expected.element_type() {
        return Err(ArrayFileError::TypeMismatch {
            expected: expected.element_type(),
            actual: actual.element_type(),
        });
    }
    if actual.shape() != expected.shape() {
        return Err(ArrayFileError::ShapeMismatch {
            expected: expected.shape().to_vec(),
            actual: actual.shape().to_vec(),
        });
    }
    Ok(())
}

fn format_elements(record: &ArrayRecord) -> String {
    dispatch_element!(record.element_type(), T => record
        .to_vec::<T>()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" "))
}
