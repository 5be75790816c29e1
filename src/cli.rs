//! Command-line interface components.

use crate::config::{ExtractorConfig, OutputFormat};
use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_INPUT_PATTERN};
use crate::writer::OutputTarget;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "gfip")]
#[command(about = "Extract worker records from GFIP/SEFIP text reports into CSV or Parquet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Report file, or directory searched recursively for reports
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file (CSV is written to stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (csv, parquet)
    #[arg(long, default_value = "csv")]
    pub format: OutputFormat,

    /// Worker field allowed to be captured empty (repeatable)
    #[arg(long = "nullable", value_name = "FIELD")]
    pub nullable_worker: Vec<String>,

    /// Header field allowed to be captured empty (repeatable)
    #[arg(long = "nullable-header", value_name = "FIELD")]
    pub nullable_header: Vec<String>,

    /// Prepend a source_file column with each report's file name
    #[arg(long)]
    pub source_column: bool,

    /// File name pattern used when INPUT is a directory
    #[arg(long, default_value = DEFAULT_INPUT_PATTERN)]
    pub pattern: String,

    /// Records buffered per write batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Enable verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors and hide progress
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Output target, stdout when no path was given
    pub fn output_target(&self) -> OutputTarget {
        match &self.output {
            Some(path) => OutputTarget::File(path.clone()),
            None => OutputTarget::Stdout,
        }
    }

    /// Build the run configuration from the arguments
    pub fn to_config(&self) -> ExtractorConfig {
        let mut config = ExtractorConfig::default()
            .with_output_format(self.format)
            .with_batch_size(self.batch_size)
            .with_input_pattern(self.pattern.clone());
        if self.source_column {
            config = config.with_source_column();
        }
        for field in &self.nullable_header {
            config = config.with_nullable_header_field(field.clone());
        }
        for field in &self.nullable_worker {
            config = config.with_nullable_worker_field(field.clone());
        }
        config
    }

    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Set up structured logging on stderr
pub fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gfip_extractor={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    debug!("Logging initialized at level: {}", log_level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["gfip", "report.txt"]).unwrap();

        assert_eq!(args.input, PathBuf::from("report.txt"));
        assert_eq!(args.output_target(), OutputTarget::Stdout);
        assert_eq!(args.get_log_level(), "info");
        assert_eq!(args.to_config(), ExtractorConfig::default());
    }

    #[test]
    fn test_full_argument_set() {
        let args = Args::try_parse_from([
            "gfip",
            "reports/",
            "-o",
            "out.parquet",
            "--format",
            "parquet",
            "--nullable",
            "cbo",
            "--nullable",
            "admissao",
            "--nullable-header",
            "fap",
            "--source-column",
            "--pattern",
            "*.TXT",
            "--batch-size",
            "250",
            "-v",
        ])
        .unwrap();

        let config = args.to_config();
        assert_eq!(config.output_format, OutputFormat::Parquet);
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.input_pattern, "*.TXT");
        assert!(config.include_source_column);
        assert_eq!(config.nullable_worker_fields, vec!["cbo", "admissao"]);
        assert_eq!(config.nullable_header_fields, vec!["fap"]);
        assert_eq!(
            args.output_target(),
            OutputTarget::File(PathBuf::from("out.parquet"))
        );
        assert_eq!(args.get_log_level(), "debug");
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Args::try_parse_from(["gfip", "r.txt", "--format", "json"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["gfip", "r.txt", "-v", "-q"]).is_err());
    }
}
