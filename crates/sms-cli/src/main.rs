//! SMS CLI - analysis and resynthesis of spectral models.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sms")]
#[command(author, version, about = "Spectral modeling analysis and resynthesis", long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resynthesize a model file into a sound file
    #[command(disable_help_flag = true)]
    Synth(commands::synth::SynthArgs),

    /// Analyze a sound file into a model file
    Analyze(commands::analyze::AnalyzeArgs),

    /// Print the header of a model file
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Synth(args) => commands::synth::run(args, cli.verbose),
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Info(args) => commands::info::run(args),
    }
}
