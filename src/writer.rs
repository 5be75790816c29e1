//! Record output in CSV or Parquet format.
//!
//! Records are buffered into batches and converted to polars DataFrames of
//! string columns. CSV batches are appended to the sink as they fill, with
//! the header row written once. Parquet batches are stacked and written in
//! one go on [`RecordWriter::finish`].

use crate::config::OutputFormat;
use crate::error::{GfipError, Result};
use crate::models::Record;

use polars::prelude::{
    Column, CsvWriter, DataFrame, ParquetCompression, ParquetWriter as PolarsParquetWriter,
    SerWriter,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where records end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    pub fn describe(&self) -> String {
        match self {
            OutputTarget::Stdout => "stdout".to_string(),
            OutputTarget::File(path) => path.display().to_string(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            OutputTarget::Stdout => None,
            OutputTarget::File(path) => Some(path),
        }
    }
}

/// Batched record sink
pub struct RecordWriter {
    target: OutputTarget,
    format: OutputFormat,
    batch_size: usize,
    columns: Option<Vec<String>>,
    buffer: Vec<Record>,
    csv_sink: Option<Box<dyn Write>>,
    parquet_frames: Vec<DataFrame>,
    rows_written: usize,
}

impl std::fmt::Debug for RecordWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordWriter")
            .field("target", &self.target)
            .field("format", &self.format)
            .field("batch_size", &self.batch_size)
            .field("buffered", &self.buffer.len())
            .field("rows_written", &self.rows_written)
            .finish()
    }
}

impl RecordWriter {
    /// Create a writer. Parquet output needs a file target.
    pub fn new(target: OutputTarget, format: OutputFormat, batch_size: usize) -> Result<Self> {
        if format == OutputFormat::Parquet && target == OutputTarget::Stdout {
            return Err(GfipError::configuration(
                "Parquet output requires an output file path",
            ));
        }
        if batch_size == 0 {
            return Err(GfipError::configuration("Batch size must be at least 1"));
        }

        if let Some(parent) = target.path().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| GfipError::io(parent, e))?;
            }
        }

        let csv_sink: Option<Box<dyn Write>> = match (&format, &target) {
            (OutputFormat::Csv, OutputTarget::Stdout) => {
                Some(Box::new(BufWriter::new(std::io::stdout())))
            }
            (OutputFormat::Csv, OutputTarget::File(path)) => {
                let file = File::create(path).map_err(|e| GfipError::io(path, e))?;
                Some(Box::new(BufWriter::new(file)))
            }
            (OutputFormat::Parquet, _) => None,
        };

        Ok(Self {
            target,
            format,
            batch_size,
            columns: None,
            buffer: Vec::with_capacity(batch_size),
            csv_sink,
            parquet_frames: Vec::new(),
            rows_written: 0,
        })
    }

    /// Buffer a record, writing out a batch when full
    pub fn write(&mut self, record: Record) -> Result<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush_batch()?;
        }
        Ok(())
    }

    /// Rows handed to the sink so far, excluding the pending buffer
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Write any buffered records and close the output. Returns total rows.
    pub fn finish(mut self) -> Result<usize> {
        self.flush_batch()?;

        match self.format {
            OutputFormat::Csv => {
                if let Some(sink) = self.csv_sink.as_mut() {
                    sink.flush()
                        .map_err(|e| GfipError::io(self.target.describe(), e))?;
                }
            }
            OutputFormat::Parquet => self.write_parquet()?,
        }

        debug!(
            "Wrote {} rows to {} ({})",
            self.rows_written,
            self.target.describe(),
            self.format
        );
        Ok(self.rows_written)
    }

    fn flush_batch(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let batch = std::mem::take(&mut self.buffer);
        let columns = self
            .columns
            .get_or_insert_with(|| batch[0].keys().map(str::to_string).collect());
        let mut frame = records_to_frame(columns, &batch)
            .map_err(|e| GfipError::output(self.target.describe(), e))?;

        match self.format {
            OutputFormat::Csv => {
                let include_header = self.rows_written == 0;
                if let Some(sink) = self.csv_sink.as_mut() {
                    CsvWriter::new(sink)
                        .include_header(include_header)
                        .finish(&mut frame)
                        .map_err(|e| GfipError::output(self.target.describe(), e))?;
                }
            }
            OutputFormat::Parquet => self.parquet_frames.push(frame),
        }

        self.rows_written += batch.len();
        debug!("Flushed batch of {} records", batch.len());
        Ok(())
    }

    fn write_parquet(&mut self) -> Result<()> {
        let Some(path) = self.target.path().map(Path::to_path_buf) else {
            return Ok(());
        };

        let mut frames = std::mem::take(&mut self.parquet_frames).into_iter();
        let Some(mut frame) = frames.next() else {
            warn!("No records extracted, Parquet file not written");
            return Ok(());
        };
        for next in frames {
            frame
                .vstack_mut(&next)
                .map_err(|e| GfipError::output(self.target.describe(), e))?;
        }

        let file = File::create(&path).map_err(|e| GfipError::io(&path, e))?;
        PolarsParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .finish(&mut frame)
            .map_err(|e| GfipError::output(self.target.describe(), e))?;

        Ok(())
    }
}

/// Build a string-typed frame with one column per field name.
fn records_to_frame(
    columns: &[String],
    records: &[Record],
) -> polars::error::PolarsResult<DataFrame> {
    for record in records {
        if record.len() != columns.len() {
            warn!(
                "Record with {} fields written against {} columns",
                record.len(),
                columns.len()
            );
        }
    }

    let series: Vec<Column> = columns
        .iter()
        .map(|name| {
            let values: Vec<&str> = records
                .iter()
                .map(|record| record.get(name).unwrap_or_default())
                .collect();
            Column::new(name.as_str().into(), values)
        })
        .collect();

    DataFrame::new(series)
}
