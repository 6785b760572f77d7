//! KiPurge CLI - list unreferenced and missing KiCad library items from the command line.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use kipurge::{KiPurgeCore, PurgeOptions, PurgeReport};
use std::path::Path;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kipurge")]
#[command(about = "Find unreferenced symbols and footprints in KiCad project libraries", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every library item of a project
    Report {
        /// Path to project directory
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Ignore footprints placed on the board
        #[arg(long)]
        no_pcb: bool,

        /// Exit with error code if items of this class are found
        #[arg(long, value_enum)]
        fail_on: Option<FailOn>,
    },

    /// List the project libraries resolved from the library tables
    Libraries {
        /// Path to project directory
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripts and CI
    Json,
}

#[derive(Clone, ValueEnum)]
enum FailOn {
    /// Unreferenced items exist
    Purge,
    /// Referenced items have no implementation
    Missing,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Report {
            dir,
            format,
            no_pcb,
            fail_on,
        } => handle_report(&dir, format, no_pcb, fail_on),
        Commands::Libraries { dir } => handle_libraries(&dir),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    process::exit(exit_code);
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_report(
    dir: &Path,
    format: OutputFormat,
    no_pcb: bool,
    fail_on: Option<FailOn>,
) -> anyhow::Result<i32> {
    let options = PurgeOptions {
        include_pcb: !no_pcb,
        ..Default::default()
    };

    let report = KiPurgeCore::run(dir, options)?;
    output_report(&report, &format)?;

    let failed = match fail_on {
        Some(FailOn::Purge) => report.has_purge_candidates(),
        Some(FailOn::Missing) => report.has_missing_implementations(),
        None => false,
    };
    Ok(if failed { 1 } else { 0 })
}

fn output_report(report: &PurgeReport, format: &OutputFormat) -> anyhow::Result<()> {
    report.log();
    match format {
        OutputFormat::Human => print!("{}", report.render_human()),
        OutputFormat::Json => {
            let json = report.to_json().context("serializing report")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn handle_libraries(dir: &Path) -> anyhow::Result<i32> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }
    let ctx = KiPurgeCore::load_libraries(dir, PurgeOptions::default())?;
    let report = PurgeReport::from_context(&ctx);
    print!("{}", report.libraries());
    Ok(0)
}
