//! Worklet CLI - drive the worklet runtime from the command line.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "worklet")]
#[command(author, version, about = "Worklet runtime host", long_about = None)]
struct Cli {
    /// Runtime configuration file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session: import a script, create a processor, drive ticks
    Run(commands::run::RunArgs),

    /// List the built-in module scripts and what they register
    Modules(commands::modules::ModulesArgs),

    /// Show, write, or check runtime configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::common::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => commands::run::run(args, config),
        Commands::Modules(args) => commands::modules::run(&args),
        Commands::Config(args) => commands::config::run(args, &config),
    }
}
