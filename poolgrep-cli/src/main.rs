use clap::Parser;
use colored::Colorize;
use poolgrep::{
    config::{CliOverrides, ScanConfig},
    search, ScanError, ScanReport,
};
use std::{num::NonZeroUsize, path::PathBuf, time::Duration};
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, ScanError>;

/// Search every file under a directory for a literal pattern using a pool of
/// worker threads
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Literal text to search for
    pattern: Option<String>,

    /// Root directory to search in (default: current directory)
    #[arg(short = 'd', long = "dir")]
    dir: Option<PathBuf>,

    /// Activity log file; ".log" is appended when no extension is given
    #[arg(short = 'l', long = "log-file", alias = "log_file")]
    log_file: Option<PathBuf>,

    /// Result file; ".txt" is appended when no extension is given
    #[arg(short = 'r', long = "result-file", alias = "result_file")]
    result_file: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short = 't', long)]
    threads: Option<NonZeroUsize>,

    /// Configuration file (YAML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the run summary as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let file_config = ScanConfig::load_from(cli.config.as_deref())
        .map_err(|e| ScanError::config_error(e.to_string()))?;
    let mut config = file_config.merge_with_cli(CliOverrides {
        pattern: cli.pattern,
        root_path: cli.dir,
        thread_count: cli.threads,
        result_file: cli.result_file,
        log_file: cli.log_file,
        log_level: cli.log_level,
    });
    if config.root_path == PathBuf::from(".") {
        config.root_path = std::env::current_dir()?;
    }

    init_tracing(&config.log_level);
    debug!("Effective configuration: {:?}", config);

    if config.pattern.is_empty() {
        eprintln!("{} No pattern argument", "Error:".red());
        eprintln!("Usage: poolgrep-cli \"pattern word\" [-d DIR] [-t THREADS]");
        return Err(ScanError::invalid_pattern("pattern must not be empty"));
    }

    if !cli.json {
        print_parameters(&config);
    }

    let report = search(&config)?;

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_parameters(config: &ScanConfig) {
    let paths = config.output_paths();
    println!("Directory: {}", config.root_path.display());
    println!("Log file name: {}", paths.log_file.display());
    println!("Name of result file: {}", paths.result_file.display());
    println!("Number of threads: {}", config.thread_count);
    println!("Pattern word: {}", config.pattern.blue());
}

fn print_report(report: &ScanReport) {
    let stats = &report.stats;
    println!("\n{}", "Scan complete".green());
    println!("Searched files: {}", stats.files_searched);
    println!("Files contained pattern: {}", stats.files_with_pattern);
    println!("Patterns number: {}", stats.total_matches);
    println!("Result file: {}", report.result_path.display());
    println!("Log file: {}", report.log_path.display());
    println!("Used threads: {}", report.thread_count);
    println!(
        "Elapsed time: {}",
        humantime::format_duration(Duration::from_millis(report.elapsed.as_millis() as u64))
    );

    if report.failed_tasks > 0 {
        eprintln!(
            "{} {} files could not be scanned",
            "Warning:".yellow(),
            report.failed_tasks
        );
    }
    for failure in &report.output_failures {
        eprintln!("{} {}", "Warning:".yellow(), failure.error);
    }
}
