//! topdeps CLI - download the most depended-upon npm packages

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use topdeps_core::PackageName;
use topdeps_registry::Settings;

mod commands;
mod error;
mod exit_codes;
mod util;

use crate::error::{CliError, Result};

#[derive(Parser)]
#[command(name = "topdeps")]
#[command(version)]
#[command(about = "Download the most depended-upon npm packages", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level for diagnostics on stderr (RUST_LOG overrides)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Settings file (default: <config dir>/topdeps/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List, resolve and download packages into a directory
    Download {
        /// Number of packages to download
        #[arg(short = 'n', long, env = "COUNT", default_value_t = 1500)]
        count: usize,

        /// Destination directory
        #[arg(short, long, default_value = "./packages")]
        dest: PathBuf,

        /// Override the listing page URL
        #[arg(long)]
        listing_url: Option<String>,

        /// Override the registry base URL
        #[arg(long)]
        registry_url: Option<String>,
    },

    /// Check a destination directory after a download
    Verify {
        /// Expected number of packages
        #[arg(short = 'n', long, env = "COUNT", default_value_t = 1500)]
        count: usize,

        /// Destination directory
        #[arg(short, long, default_value = "./packages")]
        dest: PathBuf,

        /// Minimum average size per package, in KiB
        #[arg(long, default_value_t = 5)]
        min_kib_per_package: u64,

        /// Package that must be present (repeatable)
        #[arg(long = "expect")]
        expect: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    // Set debug level
    if cli.debug {
        // SAFETY: We're the only thread at this point (start of main)
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }

    let level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };
    initialize_tracing(level);

    if let Err(err) = dispatch(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Download {
            count,
            dest,
            listing_url,
            registry_url,
        } => {
            let mut settings = load_settings(cli.config.as_deref())?;
            if let Some(url) = listing_url {
                settings.listing_url = url;
            }
            if let Some(url) = registry_url {
                settings.registry_url = url;
            }
            commands::download::run(settings, count, &dest)
        }

        Commands::Verify {
            count,
            dest,
            min_kib_per_package,
            expect,
        } => {
            let expect = expect
                .iter()
                .map(|name| PackageName::parse(name))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let options = commands::verify::VerifyOptions {
                count,
                min_kib_per_package,
                expect,
            };
            commands::verify::run(&dest, &options)
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let loaded = match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };

    loaded.map_err(|e| {
        CliError::config_with_help(
            e.to_string(),
            "Check the settings file, or pass --config with another path",
        )
    })
}

/// Install the stderr subscriber; `RUST_LOG` wins over `--log-level`
fn initialize_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
