//! ---
//! lgate_section: "05-cli"
//! lgate_subsection: "binary"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Console host running the license gate."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lgate_common::config::{AppConfig, LoadedAppConfig};
use lgate_common::logging::init_tracing;
use lgate_logging as logging;
use tracing::info;

mod check;
mod issue;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "LGATE license gate control utility",
    long_about = None
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "Path to configuration file"
    )]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the startup license cycle; exits 2 when blocked")]
    Check(check::CheckCommand),
    #[command(about = "Query the license authority once and print the status")]
    Verify(check::VerifyCommand),
    #[command(about = "Sign a license file with a development key")]
    Issue(issue::IssueCommand),
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Check(cmd) => {
            let loaded = load_config(cli.config)?;
            cmd.execute(loaded.config)
        }
        Commands::Verify(cmd) => {
            let loaded = load_config(cli.config)?;
            cmd.execute(loaded.config)
        }
        Commands::Issue(cmd) => {
            logging::init();
            cmd.execute()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(explicit: Option<PathBuf>) -> Result<LoadedAppConfig> {
    let loaded = match explicit {
        Some(path) => AppConfig::load_explicit(path)?,
        None => AppConfig::load_or_default(&[
            PathBuf::from("lgate.toml"),
            PathBuf::from("configs/lgate.toml"),
        ])?,
    };
    init_tracing("lgatectl", &loaded.config.logging)?;
    match &loaded.source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => info!("configuration defaults in effect"),
    }
    Ok(loaded)
}
