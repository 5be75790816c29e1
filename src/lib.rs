//! GFIP Extractor Library
//!
//! Extracts flat worker records from GFIP/SEFIP text reports. A report is a
//! line stream with a repeating two-level structure: a header section per
//! establishment and period, followed by any number of worker sections.
//! Sections are delimited by boundary lines, not by a grammar.
//!
//! This library provides:
//! - Capture rule catalogs and boundary predicates ([`catalog`])
//! - The per-section capture state machine ([`watcher`])
//! - Period normalization, including the thirteenth-salary month ([`period`])
//! - The scan loop correlating headers and workers into records ([`correlator`])
//! - Batched CSV and Parquet output ([`writer`]) and file orchestration ([`processor`])
//!
//! ```
//! use gfip_extractor::{ExtractorConfig, RecordStream, gfip_layout};
//!
//! let layout = gfip_layout(&ExtractorConfig::default())?;
//! let report = "no sections here\n";
//! let records = RecordStream::from_text(&layout, report).collect::<Result<Vec<_>, _>>()?;
//! assert!(records.is_empty());
//! # Ok::<(), gfip_extractor::GfipError>(())
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod constants;
pub mod correlator;
pub mod dialect;
pub mod error;
pub mod models;
pub mod period;
pub mod processor;
pub mod watcher;
pub mod writer;

// Re-export commonly used types
pub use catalog::{Boundary, CaptureRule, ReportLayout, SectionSpec};
pub use config::{ExtractorConfig, OutputFormat};
pub use constants::MISSING_SENTINEL;
pub use correlator::RecordStream;
pub use dialect::gfip_layout;
pub use error::{ErrorKind, GfipError, Result};
pub use models::{ProcessingStats, Record, ScanStats, SectionKind};
pub use period::Period;
pub use processor::ReportProcessor;
pub use watcher::{SectionWatcher, Transition, WatcherState};
pub use writer::{OutputTarget, RecordWriter};
