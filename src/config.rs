//! Configuration management and validation.
//!
//! Provides the settings that shape a processing run: output format and
//! batching, which input files to pick up from a directory, and the extra
//! fields allowed to be captured empty.

use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_INPUT_PATTERN};
use crate::error::{GfipError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported output encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Comma separated text, header row first
    #[default]
    Csv,
    /// Columnar Parquet with Snappy compression
    Parquet,
}

impl FromStr for OutputFormat {
    type Err = GfipError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            other => Err(GfipError::configuration(format!(
                "Unknown output format '{}' (expected csv or parquet)",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Parquet => write!(f, "parquet"),
        }
    }
}

/// Global configuration for a GFIP extraction run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Output encoding
    pub output_format: OutputFormat,

    /// Records buffered per write batch
    pub batch_size: usize,

    /// Prepend a column with the originating file name
    pub include_source_column: bool,

    /// File name glob used when the input is a directory
    pub input_pattern: String,

    /// Header fields, beyond the dialect's own, allowed to be empty
    pub nullable_header_fields: Vec<String>,

    /// Worker fields, beyond the dialect's own, allowed to be empty
    pub nullable_worker_fields: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Csv,
            batch_size: DEFAULT_BATCH_SIZE,
            include_source_column: false,
            input_pattern: DEFAULT_INPUT_PATTERN.to_string(),
            nullable_header_fields: Vec::new(),
            nullable_worker_fields: Vec::new(),
        }
    }
}

impl ExtractorConfig {
    /// Set the output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set the number of records per write batch
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Add the source file column to every record
    pub fn with_source_column(mut self) -> Self {
        self.include_source_column = true;
        self
    }

    /// Set the directory input file pattern
    pub fn with_input_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.input_pattern = pattern.into();
        self
    }

    pub fn with_nullable_header_field(mut self, field: impl Into<String>) -> Self {
        self.nullable_header_fields.push(field.into());
        self
    }

    pub fn with_nullable_worker_field(mut self, field: impl Into<String>) -> Self {
        self.nullable_worker_fields.push(field.into());
        self
    }

    /// Compiled directory input pattern
    pub fn input_glob(&self) -> Result<glob::Pattern> {
        glob::Pattern::new(&self.input_pattern).map_err(|e| {
            GfipError::configuration(format!(
                "Invalid input pattern '{}': {}",
                self.input_pattern, e
            ))
        })
    }

    /// Check settings before a run
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(GfipError::configuration("Batch size must be at least 1"));
        }
        self.input_glob()?;
        Ok(())
    }
}
