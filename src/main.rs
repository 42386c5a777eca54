use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod check;
mod common;
mod merge;

#[derive(Parser)]
#[command(
    name = "wavemerge",
    version,
    about = "Merge longitudinal survey waves on a shared identifier.",
    long_about = "wavemerge combines one dataset per data-collection wave into a single table. Inputs may be CSV, TSV, or spreadsheet files. Wide output places each wave's variables side by side with wave suffixes; long output stacks the waves with a wave column. Logging goes to stderr and honours RUST_LOG."
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge wave datasets into one wide or long table
    Merge(merge::MergeArgs),
    /// Preview wave datasets and check the identifier without merging
    Check(check::CheckArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "wavemerge=debug" } else { "wavemerge=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Merge(args) => merge::run(args),
        Commands::Check(args) => check::run(args),
    }
}
