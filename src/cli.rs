use clap::{Parser, Subcommand};

use crate::auth::TokenValidity;

#[derive(Parser, Debug)]
#[command(name = "jobledger", version, about = "Job queue bookkeeping service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run migrations, then serve the job API and dashboard (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Create an app credential and print it
    IssueToken {
        /// Free-text note shown in the dashboard
        #[arg(long)]
        comment: String,
        #[arg(long, value_enum, default_value = "week")]
        validity: TokenValidity,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}
