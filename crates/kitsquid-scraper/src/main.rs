// Copyright 2026 Kitsquid Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use kitsquid_scraper::cli::{self, session::Session};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "kitsquid-scrape",
    about = "Scrape a university lecture catalog into the Kitsquid store",
    version,
    after_help = "Run 'kitsquid-scrape <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Config file (default: ~/.kitsquid/config.json if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store file (default: ~/.kitsquid/catalog.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover all events of a term and upsert them
    Events {
        /// Term key, e.g. "WS19/20"
        term: String,
        /// First faculty index to scrape
        #[arg(long)]
        from: Option<usize>,
        /// Stop before this faculty index
        #[arg(long)]
        to: Option<usize>,
    },
    /// Fetch descriptions and links for stored events of a term
    Details {
        /// Term key, e.g. "WS19/20"
        term: String,
    },
    /// Run `events` then `details`
    Run {
        term: String,
        #[arg(long)]
        from: Option<usize>,
        #[arg(long)]
        to: Option<usize>,
    },
    /// Apply pending store migrations
    Migrate,
    /// Re-sanitize every stored description
    BackfillHtml,
    /// Show one stored event
    Show {
        /// Internal event id (gguid)
        id: String,
    },
    /// List configured terms
    Terms,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(verbose: bool, quiet: bool, json: bool) {
    let default = if verbose {
        "kitsquid_scraper=debug"
    } else if quiet {
        "kitsquid_scraper=warn"
    } else {
        "kitsquid_scraper=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Global flags as environment variables so all modules can check them
    if cli.json {
        std::env::set_var("KITSQUID_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("KITSQUID_QUIET", "1");
    }
    if cli.verbose {
        std::env::set_var("KITSQUID_VERBOSE", "1");
    }

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "kitsquid-scrape", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(cli.verbose, cli.quiet, cli.json);

    let result = match Session::load(cli.config.as_deref(), cli.db.as_deref()) {
        Err(e) => Err(e),
        Ok(session) => match cli.command {
            Commands::Events { term, from, to } => {
                cli::scrape_cmd::run_events(&session, &term, from, to).await
            }
            Commands::Details { term } => cli::scrape_cmd::run_details(&session, &term).await,
            Commands::Run { term, from, to } => {
                cli::scrape_cmd::run_all(&session, &term, from, to).await
            }
            Commands::Migrate => cli::store_cmd::run_migrate(&session).await,
            Commands::BackfillHtml => cli::store_cmd::run_backfill(&session).await,
            Commands::Show { id } => cli::store_cmd::run_show(&session, &id).await,
            Commands::Terms => cli::terms_cmd::run(&session).await,
            Commands::Completions { .. } => Ok(()),
        },
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !cli::output::is_quiet() && !cli::output::is_json() {
            eprintln!("  Error: {e:#}");
        }
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}
