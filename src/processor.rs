//! Processing engine for GFIP report extraction.
//!
//! Orchestrates a run: input discovery, one forward scan per report file,
//! and batched output of every record produced. Any fatal scan error aborts
//! the whole run.

use crate::catalog::ReportLayout;
use crate::config::ExtractorConfig;
use crate::constants::{PROGRESS_UPDATE_INTERVAL, SOURCE_COLUMN};
use crate::correlator::RecordStream;
use crate::dialect::gfip_layout;
use crate::error::{GfipError, Result};
use crate::models::{ProcessingStats, ScanStats};
use crate::writer::{OutputTarget, RecordWriter};

use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Main processor for GFIP report extraction
#[derive(Debug)]
pub struct ReportProcessor {
    input_path: PathBuf,
    output: OutputTarget,
    config: ExtractorConfig,
    show_progress: bool,
}

impl ReportProcessor {
    /// Create a processor for a report file or a directory of reports
    pub fn new(input_path: PathBuf, output: OutputTarget) -> Result<Self> {
        if !input_path.exists() {
            return Err(GfipError::InputNotFound { path: input_path });
        }

        Ok(Self {
            input_path,
            output,
            config: ExtractorConfig::default(),
            show_progress: true,
        })
    }

    /// Configure the processor
    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    /// Toggle the progress spinner
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Main processing entry point
    pub fn process(&self) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        self.config.validate()?;
        let layout = gfip_layout(&self.config)?;

        let reports = self.discover_reports()?;
        info!(
            "Found {} report file(s) under {}",
            reports.len(),
            self.input_path.display()
        );

        let mut stats = ProcessingStats {
            output_path: self.output.path().map(Path::to_path_buf),
            ..Default::default()
        };
        if reports.is_empty() {
            warn!(
                "No files matching '{}' in {}",
                self.config.input_pattern,
                self.input_path.display()
            );
        }

        let mut writer = RecordWriter::new(
            self.output.clone(),
            self.config.output_format,
            self.config.batch_size,
        )?;
        let progress = self.progress_bar();

        for report in &reports {
            let scan = self
                .process_file(report, &layout, &mut writer, &progress)
                .inspect_err(|e| {
                    error!("Extraction failed in {}: {}", report.display(), e);
                    progress.abandon();
                })?;
            stats.absorb(&scan);
        }

        let rows = writer.finish()?;
        progress.finish_and_clear();
        debug!("Writer reported {} rows", rows);

        stats.processing_time_ms = start_time.elapsed().as_millis();
        Ok(stats)
    }

    /// Resolve the input path into a sorted list of report files
    pub fn discover_reports(&self) -> Result<Vec<PathBuf>> {
        if self.input_path.is_file() {
            return Ok(vec![self.input_path.clone()]);
        }

        let pattern = self.config.input_glob()?;
        let mut reports = Vec::new();
        for entry in WalkDir::new(&self.input_path) {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.input_path.clone());
                GfipError::io(path, e.into())
            })?;

            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| pattern.matches(name));
            if entry.file_type().is_file() && matches {
                reports.push(entry.into_path());
            }
        }

        reports.sort();
        Ok(reports)
    }

    fn process_file(
        &self,
        path: &Path,
        layout: &ReportLayout,
        writer: &mut RecordWriter,
        progress: &ProgressBar,
    ) -> Result<ScanStats> {
        info!("Scanning report: {}", path.display());
        let file = File::open(path).map_err(|e| GfipError::io(path, e))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut stream = RecordStream::from_reader(layout, BufReader::new(file)).with_source(path);
        let mut emitted = 0;
        for item in stream.by_ref() {
            let mut record = item?;
            if self.config.include_source_column {
                record.prepend(SOURCE_COLUMN, file_name.as_str());
            }
            writer.write(record)?;

            emitted += 1;
            if emitted % PROGRESS_UPDATE_INTERVAL == 0 {
                progress.set_message(format!("{}: {} records", file_name, emitted));
            }
        }
        progress.inc(1);

        let scan = stream.into_stats();
        for missing in &scan.tolerated_missing {
            debug!(
                "{}: {} field '{}' missing at line {}",
                file_name, missing.section, missing.field, missing.line
            );
        }
        info!(
            "{}: {} records from {} lines ({} tolerated missing fields)",
            file_name,
            scan.records_emitted,
            scan.lines_read,
            scan.tolerated_missing.len()
        );
        Ok(scan)
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} files {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        progress.enable_steady_tick(std::time::Duration::from_millis(120));
        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_missing_input_is_rejected() {
        let err = ReportProcessor::new(PathBuf::from("/nonexistent/gfip.txt"), OutputTarget::Stdout)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputNotFound);
    }

    #[test]
    fn test_discover_reports_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("2020")).unwrap();
        std::fs::write(dir.path().join("2020").join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::write(dir.path().join("notes.md"), "").unwrap();

        let processor = ReportProcessor::new(dir.path().to_path_buf(), OutputTarget::Stdout)
            .unwrap()
            .with_progress(false);
        let reports = processor.discover_reports().unwrap();

        assert_eq!(
            reports,
            vec![dir.path().join("2020").join("b.txt"), dir.path().join("a.txt")]
        );
    }

    #[test]
    fn test_single_file_input() {
        let dir = TempDir::new().unwrap();
        let report = dir.path().join("report.dat");
        std::fs::write(&report, "").unwrap();

        // the pattern only applies to directories
        let processor = ReportProcessor::new(report.clone(), OutputTarget::Stdout).unwrap();
        assert_eq!(processor.discover_reports().unwrap(), vec![report]);
    }
}
