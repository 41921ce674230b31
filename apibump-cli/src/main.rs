//! apibump CLI - semantic version bump recommendations
//!
//! Compares the public interface of a Python project at two references and
//! suggests a `major`, `minor`, `patch` or `none` release.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod git;
mod output;

use commands::decide::{DecideOptions, Source};
use commands::{analysers, decide};
use config::ApibumpConfig;
use output::{OutputConfig, OutputFormat};

/// Suggest semantic version bumps from interface changes.
#[derive(Parser)]
#[command(name = "apibump")]
#[command(author, version)]
#[command(about = "Suggest semantic version bumps from public interface changes")]
#[command(propagate_version = true)]
#[command(after_help = "Examples:
  apibump decide                         Compare HEAD^ with HEAD
  apibump decide --base v1.2.0 --format md
  apibump decide --enable web_routes --enable cli
  apibump decide --source dir --base old/ --head new/
  apibump analysers                      List analysers and their state")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Configuration file (default: ./apibump.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fail on configuration errors instead of using defaults
    #[arg(long, global = true)]
    strict: bool,

    /// Enable an analyser (repeatable)
    #[arg(long = "enable", value_name = "NAME", global = true)]
    enable: Vec<String>,

    /// Disable an analyser (repeatable)
    #[arg(long = "disable", value_name = "NAME", global = true)]
    disable: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend a version bump between two references
    Decide {
        /// Base reference (git revision, or directory with --source dir)
        #[arg(long, default_value = "HEAD^")]
        base: String,

        /// Head reference (git revision, or directory with --source dir)
        #[arg(long, default_value = "HEAD")]
        head: String,

        /// Where references are read from
        #[arg(long, value_enum, default_value_t = Source::Git)]
        source: Source,
    },

    /// List registered analysers and whether they are enabled
    Analysers,
}

/// Setup logging based on verbosity flags
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Load configuration from apibump.toml
    let root = Path::new(".");
    let config = if cli.strict {
        ApibumpConfig::load_strict(root, cli.config.as_deref())?
    } else {
        ApibumpConfig::load(root, cli.config.as_deref())
    };

    // Resolve output format: CLI flag > config default > text
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default()
    });

    let mut output = OutputConfig::auto_detect(format, config.use_color());
    if let Some(width) = config.table_width() {
        output = output.with_width(width);
    }
    colored::control::set_override(output.use_colors());

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        println!();
        return Ok(());
    };

    match command {
        Commands::Decide { base, head, source } => {
            let options = DecideOptions {
                base,
                head,
                source,
                enable: cli.enable,
                disable: cli.disable,
                quiet: cli.quiet,
            };
            decide::run(options, config, output).await
        }
        Commands::Analysers => analysers::run(&config, &cli.enable, &cli.disable, output),
    }
}
