//! Gatewatch CLI - Security console for intercepted HTTP traffic
//!
//! Usage:
//!   gatewatch watch                  Follow the live capture feed
//!   gatewatch analyze [RAW]          Classify a pasted raw request
//!   gatewatch replay <ID>            Edit and resend a captured request
//!   gatewatch capture <start|stop>   Toggle traffic capture
//!   gatewatch stats                  Show dashboard telemetry
//!   gatewatch check <URL>            Check a URL's reputation

mod api;
mod commands;
mod config;
mod inspector;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gatewatch")]
#[command(author = "Gatewatch Team")]
#[command(version)]
#[command(about = "Security console for intercepted HTTP traffic", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the live capture feed
    Watch {
        /// Start traffic capture before following the feed
        #[arg(long)]
        start_capture: bool,
    },

    /// Classify a pasted raw HTTP request
    Analyze {
        /// Raw request text (reads stdin when omitted)
        raw: Option<String>,

        /// Read the raw request from a file instead
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Edit and resend a captured request
    Replay {
        /// Captured request id (or prefix)
        id: String,

        /// Override the HTTP method
        #[arg(short, long)]
        method: Option<String>,

        /// Override the target URL
        #[arg(short, long)]
        url: Option<String>,

        /// Set a header (NAME:VALUE, repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Remove a header by name (repeatable)
        #[arg(long = "drop-header")]
        drop_headers: Vec<String>,

        /// Override the request body
        #[arg(short, long)]
        body: Option<String>,

        /// Body view mode for the draft printout
        #[arg(long, value_parser = ["pretty", "raw", "hex"])]
        view: Option<String>,
    },

    /// Toggle traffic capture on the backend
    Capture {
        #[command(subcommand)]
        action: CaptureAction,
    },

    /// Show dashboard telemetry
    Stats,

    /// Check a URL's reputation
    Check {
        /// URL to look up
        url: String,
    },
}

#[derive(Subcommand)]
enum CaptureAction {
    /// Start capturing traffic
    Start,

    /// Stop capturing traffic
    Stop,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},gatewatch_cli=info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    // Ensure config directories exist
    config::ensure_dirs()?;

    // Handle commands
    match cli.command {
        Commands::Watch { start_capture } => {
            commands::watch::run(start_capture).await?;
        }

        Commands::Analyze { raw, file } => {
            commands::analyze::run(raw, file).await?;
        }

        Commands::Replay {
            id,
            method,
            url,
            headers,
            drop_headers,
            body,
            view,
        } => {
            let opts = commands::replay::ReplayOptions {
                id,
                method,
                url,
                headers,
                drop_headers,
                body,
                view,
            };
            commands::replay::run(opts).await?;
        }

        Commands::Capture { action } => match action {
            CaptureAction::Start => commands::capture::start().await?,
            CaptureAction::Stop => commands::capture::stop().await?,
        },

        Commands::Stats => {
            commands::stats::run().await?;
        }

        Commands::Check { url } => {
            commands::check::run(url).await?;
        }
    }

    Ok(())
}
