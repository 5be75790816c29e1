//! Scan loop correlating header and worker sections into flat records.
//!
//! [`RecordStream`] drives one header watcher and one worker watcher over a
//! line source in lockstep. For every line the header watcher runs first,
//! then the worker watcher. A closed worker section is merged with the most
//! recently closed header section and yielded immediately; a closed header
//! section is normalized and replaces the previous one.
//!
//! The stream is pull-based, single-pass and fused: the first error ends it.

use crate::catalog::ReportLayout;
use crate::error::{GfipError, Result};
use crate::models::{FieldList, Record, ScanStats, SectionKind, ToleratedMissing};
use crate::period::normalize_header;
use crate::watcher::{Flushed, SectionWatcher, Transition, WatcherState};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Line source over in-memory text
pub type TextLines<'t> = std::iter::Map<std::str::Lines<'t>, fn(&'t str) -> io::Result<String>>;

fn owned_line(line: &str) -> io::Result<String> {
    Ok(line.to_string())
}

/// Lazy sequence of records produced from a line source
#[derive(Debug)]
pub struct RecordStream<'a, I> {
    header: SectionWatcher<'a>,
    worker: SectionWatcher<'a>,
    header_state: WatcherState,
    worker_state: WatcherState,
    last_header: Option<FieldList>,
    lines: I,
    line_no: usize,
    source: Option<PathBuf>,
    stats: ScanStats,
    pending_error: Option<GfipError>,
    finished: bool,
}

impl<'a, I> RecordStream<'a, I>
where
    I: Iterator<Item = io::Result<String>>,
{
    pub fn new(layout: &'a ReportLayout, lines: I) -> Self {
        Self {
            header: SectionWatcher::new(layout.header()),
            worker: SectionWatcher::new(layout.worker()),
            header_state: WatcherState::Idle,
            worker_state: WatcherState::Idle,
            last_header: None,
            lines,
            line_no: 0,
            source: None,
            stats: ScanStats::default(),
            pending_error: None,
            finished: false,
        }
    }

    /// Name the input for I/O error messages
    pub fn with_source(mut self, path: impl AsRef<Path>) -> Self {
        self.source = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn into_stats(self) -> ScanStats {
        self.stats
    }

    fn process_line(&mut self, line: &str) -> Result<Option<Record>> {
        let line_no = self.line_no;

        let (state, header_event) =
            self.header
                .step(std::mem::take(&mut self.header_state), line, line_no)?;
        self.header_state = state;

        let (state, worker_event) =
            self.worker
                .step(std::mem::take(&mut self.worker_state), line, line_no)?;
        self.worker_state = state;

        let mut record = None;
        if let Some(Transition::Closed(flushed)) = worker_event {
            self.note_tolerated(SectionKind::Worker, &flushed, line_no);
            let header = self
                .last_header
                .as_ref()
                .ok_or(GfipError::OrphanWorkerSection { line: line_no })?;
            record = Some(Record::merge(header, flushed.fields));
            self.stats.workers_completed += 1;
            self.stats.records_emitted += 1;
        }

        if let Some(Transition::Closed(flushed)) = header_event {
            self.note_tolerated(SectionKind::Header, &flushed, line_no);
            match normalize_header(flushed.fields) {
                Ok(normalized) => {
                    self.last_header = Some(normalized);
                    self.stats.headers_completed += 1;
                }
                // a record completed on this same line is still delivered
                Err(e) if record.is_some() => self.pending_error = Some(e.at_line(line_no)),
                Err(e) => return Err(e.at_line(line_no)),
            }
        }

        Ok(record)
    }

    fn note_tolerated(&mut self, section: SectionKind, flushed: &Flushed, line: usize) {
        if let Some(field) = &flushed.tolerated {
            self.stats.tolerated_missing.push(ToleratedMissing {
                section,
                field: field.clone(),
                line,
            });
        }
    }

    fn finish_input(&mut self) {
        for (kind, state) in [
            (SectionKind::Header, &self.header_state),
            (SectionKind::Worker, &self.worker_state),
        ] {
            if state.is_active() {
                warn!("{} section still open at end of input, discarded", kind);
                self.stats.unterminated_sections += 1;
            }
        }

        debug!(
            "Scan finished: {} lines, {} headers, {} workers, {} records",
            self.stats.lines_read,
            self.stats.headers_completed,
            self.stats.workers_completed,
            self.stats.records_emitted
        );
    }

    fn fail(&mut self, error: GfipError) -> Option<Result<Record>> {
        self.finished = true;
        Some(Err(error))
    }
}

impl<'a, R: BufRead> RecordStream<'a, io::Lines<R>> {
    /// Scan a buffered reader line by line
    pub fn from_reader(layout: &'a ReportLayout, reader: R) -> Self {
        Self::new(layout, reader.lines())
    }
}

impl<'a, 't> RecordStream<'a, TextLines<'t>> {
    /// Scan in-memory report text
    pub fn from_text(layout: &'a ReportLayout, text: &'t str) -> Self {
        let lines: TextLines<'t> = text
            .lines()
            .map(owned_line as fn(&'t str) -> io::Result<String>);
        Self::new(layout, lines)
    }
}

impl<I> Iterator for RecordStream<'_, I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.pending_error.take() {
            return self.fail(error);
        }

        while !self.finished {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(source)) => {
                    let path = self
                        .source
                        .clone()
                        .unwrap_or_else(|| PathBuf::from("<input>"));
                    return self.fail(GfipError::io(path, source));
                }
                None => {
                    self.finished = true;
                    self.finish_input();
                    return None;
                }
            };

            self.line_no += 1;
            self.stats.lines_read += 1;

            match self.process_line(line.trim_end_matches('\r')) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => {}
                Err(error) => return self.fail(error),
            }
        }

        None
    }
}
