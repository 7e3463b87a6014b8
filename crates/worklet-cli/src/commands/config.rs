//! Configuration commands.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use worklet_config::RuntimeConfig;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Write a configuration file with default values
    Init {
        /// Output path
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Parse and validate a configuration file
    Check {
        /// File to check
        path: PathBuf,
    },
}

pub fn run(args: ConfigArgs, effective: &RuntimeConfig) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            print!("{}", effective.to_toml()?);
        }
        ConfigCommand::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            RuntimeConfig::default().save(&path)?;
            println!("Wrote {}", path.display());
        }
        ConfigCommand::Check { path } => {
            let config = RuntimeConfig::load(&path)
                .with_context(|| format!("checking {}", path.display()))?;
            println!(
                "{}: ok ({} Hz, {:?} remainder, session {} via {:?})",
                path.display(),
                config.sample_rate,
                config.remainder_policy,
                config.session.module,
                config.session.transport
            );
        }
    }
    Ok(())
}
