//! Error handling for GFIP report extraction.
//!
//! Every fatal condition of a scan has its own variant carrying the section,
//! field and line that triggered it, so callers can branch on
//! [`GfipError::kind`] instead of parsing messages.

use crate::models::SectionKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GfipError {
    #[error("Empty value captured for field '{field}' in {section} section at line {line}")]
    EmptyCapturedValue {
        section: SectionKind,
        field: String,
        line: usize,
    },

    #[error(
        "Incomplete {section} section closed at line {line}: missing fields {}",
        .missing.join(", ")
    )]
    IncompleteSection {
        section: SectionKind,
        missing: Vec<String>,
        line: usize,
    },

    #[error("Worker section closed at line {line} before any header section completed")]
    OrphanWorkerSection { line: usize },

    #[error("Unrecognized month '{month}' in period (line {})", display_line(.line))]
    UnrecognizedMonth { month: String, line: Option<usize> },

    #[error("Malformed period '{raw}' (line {})", display_line(.line))]
    MalformedPeriod { raw: String, line: Option<usize> },

    #[error("Input not found at path: {}", .path.display())]
    InputNotFound { path: PathBuf },

    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pattern for '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Output error writing {target}: {source}")]
    Output {
        target: String,
        #[source]
        source: polars::error::PolarsError,
    },
}

/// Fieldless tag for each [`GfipError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyCapturedValue,
    IncompleteSection,
    OrphanWorkerSection,
    UnrecognizedMonth,
    MalformedPeriod,
    InputNotFound,
    Io,
    InvalidPattern,
    Configuration,
    Output,
}

impl GfipError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyCapturedValue { .. } => ErrorKind::EmptyCapturedValue,
            Self::IncompleteSection { .. } => ErrorKind::IncompleteSection,
            Self::OrphanWorkerSection { .. } => ErrorKind::OrphanWorkerSection,
            Self::UnrecognizedMonth { .. } => ErrorKind::UnrecognizedMonth,
            Self::MalformedPeriod { .. } => ErrorKind::MalformedPeriod,
            Self::InputNotFound { .. } => ErrorKind::InputNotFound,
            Self::Io { .. } => ErrorKind::Io,
            Self::InvalidPattern { .. } => ErrorKind::InvalidPattern,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Output { .. } => ErrorKind::Output,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an I/O error tied to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an output error for the given sink
    pub fn output(target: impl Into<String>, source: polars::error::PolarsError) -> Self {
        Self::Output {
            target: target.into(),
            source,
        }
    }

    /// Attach the line number to a period error raised without one.
    pub fn at_line(self, at: usize) -> Self {
        match self {
            Self::UnrecognizedMonth { month, line: None } => Self::UnrecognizedMonth {
                month,
                line: Some(at),
            },
            Self::MalformedPeriod { raw, line: None } => Self::MalformedPeriod {
                raw,
                line: Some(at),
            },
            other => other,
        }
    }
}

fn display_line(line: &Option<usize>) -> String {
    line.map_or_else(|| "unknown".to_string(), |l| l.to_string())
}

pub type Result<T> = std::result::Result<T, GfipError>;
