//! Cogitator OCR
//!
//! Reads mission result screenshots, runs them through OCR and extracts the
//! mission statistics as a flat JSON object for review.

mod batch;
mod config;
mod extract;
mod ocr;
mod paths;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::batch::{csv_writer, report, run_batch};
use crate::extract::{ResultMap, parse_game_data};
use crate::ocr::{OcrGateway, RawCapture};

const LOG_FILE_NAME: &str = "cogitator_ocr.log";

/// Extract mission statistics from result-screen screenshots.
#[derive(Parser, Debug)]
#[command(name = "cogitator-ocr", version)]
#[command(about = "Extract mission statistics from result-screen screenshots")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// OCR one or more screenshots of the same mission and extract its results
    Scan(ScanArgs),
    /// Extract results from previously saved raw OCR text
    Parse(ParseArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Screenshots, processed in order
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Config file (defaults to config.json next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Size ceiling per image region in KB, overriding the config
    #[arg(long)]
    max_size_kb: Option<u32>,

    /// Write the JSON result to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append the result as a row to this CSV archive
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Save an OCR debug report to the reports directory
    #[arg(long)]
    debug_report: bool,
}

#[derive(Args, Debug)]
struct ParseArgs {
    /// Text file holding raw OCR output
    text_file: PathBuf,

    /// Write the JSON result to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Logs to stderr and appends to `<exe_dir>/logs/cogitator_ocr.log`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = paths::get_logs_dir().join(LOG_FILE_NAME);
    let file_layer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok()
        .map(|file| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        error!("[PANIC]{} {}", location, msg);
        eprintln!("[PANIC]{} {}", location, msg);
    }));
}

fn main() {
    if let Err(e) = paths::ensure_directories() {
        eprintln!("Warning: failed to create output directories: {}", e);
    }
    init_logging();
    install_panic_hook();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Scan(args) => run_scan(args),
        Command::Parse(args) => run_parse(args),
    };

    if let Err(e) = outcome {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let config = config::load_config(args.config.as_deref());
    let max_size_kb = args.max_size_kb.unwrap_or(config.max_size_kb);
    let gateway = OcrGateway::from_config(&config)?;

    info!("Scanning {} screenshot(s)", args.images.len());
    let captures = args.images.iter().map(|path| RawCapture::open(path));
    let outcome = run_batch(captures, &gateway, max_size_kb)?;

    if args.debug_report {
        report::write_report(&paths::get_reports_dir(), &outcome)?;
    }
    if let Some(csv_path) = &args.csv {
        csv_writer::append_results(csv_path, Local::now(), &outcome.sources, &outcome.results)
            .with_context(|| format!("Failed to append to {}", csv_path.display()))?;
        info!("Appended results to {}", csv_path.display());
    }

    emit_results(&outcome.results, args.output.as_deref())
}

fn run_parse(args: ParseArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.text_file)
        .with_context(|| format!("Failed to read {}", args.text_file.display()))?;
    let results = parse_game_data(&raw);
    emit_results(&results, args.output.as_deref())
}

/// Prints the result map as pretty JSON, or writes it to `output`.
fn emit_results(results: &ResultMap, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(results).context("Failed to serialize results")?;
    match output {
        Some(path) => {
            fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Results written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
