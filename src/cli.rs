use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Harvest the university timetable grid into JSON-lines schedule records.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty)]
    pub tracing: TracingFormat,

    /// Config file (TOML); defaults to `schedule.toml` when present
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write records to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only crawl listings for these characters, e.g. `--letters abc`
    #[arg(long)]
    pub letters: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable output
    Pretty,
    /// One JSON object per event
    Json,
}
