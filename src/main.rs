use anyhow::Context;
use clap::Parser;
use colored::*;
use gfip_extractor::cli::{Args, setup_logging};
use gfip_extractor::{ProcessingStats, ReportProcessor};
use std::process;

fn main() {
    let args = Args::parse();
    setup_logging(&args);

    match run(&args) {
        Ok(stats) => {
            if !args.quiet {
                report_summary(&stats);
            }
            process::exit(0);
        }
        Err(error) => {
            eprintln!("{} {:#}", "Error:".bright_red().bold(), error);
            process::exit(1);
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ProcessingStats> {
    let processor = ReportProcessor::new(args.input.clone(), args.output_target())
        .context("Cannot start extraction")?
        .with_config(args.to_config())
        .with_progress(!args.quiet);

    processor
        .process()
        .with_context(|| format!("Extraction from {} failed", args.input.display()))
}

/// Print the run summary on stderr, keeping stdout for CSV output
fn report_summary(stats: &ProcessingStats) {
    eprintln!("{}", "Extraction complete".bright_green().bold());
    eprintln!(
        "  {} {}",
        "Files:".bright_cyan(),
        stats.files_processed.to_string().bright_white().bold()
    );
    eprintln!(
        "  {} {}",
        "Lines scanned:".bright_cyan(),
        stats.total_lines
    );
    eprintln!(
        "  {} {}",
        "Records:".bright_cyan(),
        stats.total_records.to_string().bright_white().bold()
    );
    if stats.tolerated_missing > 0 {
        eprintln!(
            "  {} {}",
            "Missing fields tolerated:".bright_yellow(),
            stats.tolerated_missing
        );
    }
    if let Some(path) = &stats.output_path {
        eprintln!("  {} {}", "Output:".bright_cyan(), path.display());
    }
    eprintln!(
        "  {} {:.2}s",
        "Time:".bright_cyan(),
        stats.processing_time_ms as f64 / 1000.0
    );
}
