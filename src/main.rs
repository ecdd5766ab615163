mod cli;
mod config;
mod db;
mod error;
mod journal;
mod parser;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "me-journal", version, about = "Life journal with LLM parsing and human-in-the-loop reconciliation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport unless configured otherwise)
    Serve {
        /// Serve streamable HTTP on the configured host and port
        #[arg(long)]
        http: bool,
    },
    /// Parse and file a journal entry
    Submit {
        /// The entry text
        text: String,
        /// Day the entry is for (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Show the pending clarification
    Pending,
    /// Answer the pending clarification and save the entry
    Confirm {
        /// Decisions as JSON instead of interactive prompts
        #[arg(long, conflicts_with = "retry")]
        decisions: Option<String>,
        /// Retry a failed save with the previous answers
        #[arg(long)]
        retry: bool,
    },
    /// Discard the pending clarification
    Cancel,
    /// Print one day of the journal
    Show {
        #[arg(long)]
        date: Option<String>,
    },
    /// Search entries
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Remove a task (or with --person, a person) from every entry
    Purge {
        name: String,
        #[arg(long)]
        person: bool,
    },
    /// Export all entries as JSON to stdout
    Export,
    /// Check configuration and database health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::JournalConfig::load()?;

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { http } => {
            if http || config.server.transport == "http" {
                server::serve_http(config).await?;
            } else {
                server::serve_stdio(config).await?;
            }
        }
        // The agent parser uses a blocking HTTP client, which must not run
        // on the async runtime's worker threads.
        Command::Submit { text, date } => {
            tokio::task::spawn_blocking(move || cli::entry::submit(&config, &text, date.as_deref()))
                .await??;
        }
        Command::Pending => cli::entry::pending(&config)?,
        Command::Confirm { decisions, retry } => {
            cli::entry::confirm(&config, decisions.as_deref(), retry)?
        }
        Command::Cancel => cli::entry::cancel(&config)?,
        Command::Show { date } => cli::show::show(&config, date.as_deref())?,
        Command::Search { query, limit } => cli::search::search(&config, &query, limit)?,
        Command::Purge { name, person } => cli::purge::purge(&config, &name, person)?,
        Command::Export => cli::export::export(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
