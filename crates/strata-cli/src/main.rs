//! # strata-cli
//!
//! Command line front end for the strata resolver: resolve a specifier the
//! way the build would, print the source of a virtual module, or dump the
//! engine partition of an app.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use strata_core::{StrataError, StrataResult};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Module resolution for classic ember packages
#[derive(Parser)]
#[command(name = "strata", version, about = "Module resolution for classic ember packages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Working directory holding node_modules/.strata/resolver.json
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<Utf8PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a specifier as imported from a file
    Resolve {
        specifier: String,
        /// The importing file
        #[arg(long)]
        from: Utf8PathBuf,
        /// Drive the resolver through its async entry point
        #[arg(long = "async")]
        use_async: bool,
    },
    /// Print the source of a virtual module
    Content {
        /// Virtual module id, as printed by `resolve`
        id: String,
        /// Also list the files the content depends on
        #[arg(long)]
        watches: bool,
    },
    /// Print the engine partition of an app as JSON
    Engines {
        /// App root; defaults to the working directory
        #[arg(long)]
        app: Option<Utf8PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    debug!("Starting strata v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_cli(cli) {
        eprint!("{}", ErrorFormatter::new().format_error(&e));
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> StrataResult<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| StrataError::io("Failed to create async runtime", e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.cwd)?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "strata_cli={0},strata_resolver={0},strata_packages={0},strata_config={0}",
            level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("strata encountered an unexpected error: {}", panic_info);
        eprintln!("strata crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}
