//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Team news collector and filterable article page")]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "TEAM_WIRE_CONFIG", default_value = "feeds.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Serve the article page (default)
    Serve,
    /// Fetch the configured feeds once and write the feed document
    Collect,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Serve)
    }
}
