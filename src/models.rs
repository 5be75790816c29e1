//! Core data structures shared by the scan loop and its consumers.
//!
//! Defines section kinds, flushed field lists, output records and the
//! statistics gathered while scanning and writing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Section types tracked by the scan loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    Header,
    Worker,
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKind::Header => write!(f, "header"),
            SectionKind::Worker => write!(f, "worker"),
        }
    }
}

/// Ordered `(name, value)` pairs, in catalog order.
pub type FieldList = Vec<(String, String)>;

/// One flat output row: header-derived fields followed by worker fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Record {
    fields: FieldList,
}

impl Record {
    /// Merge header and worker fields. Worker values replace header values
    /// sharing the same name, keeping the header's position.
    pub fn merge(header: &[(String, String)], worker: FieldList) -> Self {
        let mut fields: FieldList = header.to_vec();
        for (name, value) in worker {
            match fields.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = value,
                None => fields.push((name, value)),
            }
        }
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Put a field in front of all others, e.g. the originating file.
    pub fn prepend(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(0, (name.into(), value.into()));
    }

    pub fn into_fields(self) -> FieldList {
        self.fields
    }
}

/// A catalog field that was never captured but tolerated at flush
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToleratedMissing {
    pub section: SectionKind,
    pub field: String,
    pub line: usize,
}

/// Counters for a single scan over one line source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub lines_read: usize,
    pub headers_completed: usize,
    pub workers_completed: usize,
    pub records_emitted: usize,
    pub unterminated_sections: usize,
    pub tolerated_missing: Vec<ToleratedMissing>,
}

/// Totals for a processing run across all input files
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub files_processed: usize,
    pub total_lines: usize,
    pub total_records: usize,
    pub tolerated_missing: usize,
    pub output_path: Option<PathBuf>,
    pub processing_time_ms: u128,
}

impl ProcessingStats {
    /// Fold one file's scan counters into the run totals
    pub fn absorb(&mut self, scan: &ScanStats) {
        self.files_processed += 1;
        self.total_lines += scan.lines_read;
        self.total_records += scan.records_emitted;
        self.tolerated_missing += scan.tolerated_missing.len();
    }
}
