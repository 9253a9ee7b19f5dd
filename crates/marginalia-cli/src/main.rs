//! Marginalia CLI
//!
//! Command-line interface for Marginalia - e-reader highlights to Markdown notes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use marginalia_core::{Config, ImportOptions, SortOrder, Store};

mod commands;
mod logging;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "marginalia")]
#[command(about = "Marginalia - Kobo highlights to Markdown notes")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append new highlights from the reader to the book notes
    Import {
        /// Import only the book with this title
        #[arg(short, long)]
        book: Option<String>,
        /// Also create notes for books without highlights
        #[arg(long)]
        all_books: bool,
        /// Highlight order: chapter or created
        #[arg(long, value_name = "ORDER")]
        order: Option<SortOrder>,
    },
    /// Promote annotated highlights to insight notes
    Extract {
        /// Book title (all book notes when omitted)
        book: Option<String>,
    },
    /// Show highlight and insight counts
    Stats {
        /// Book title (all book notes when omitted)
        book: Option<String>,
        /// Recompute the cached counts in the note headers
        #[arg(long)]
        refresh: bool,
    },
    /// List books on the reader
    #[command(alias = "ls")]
    Books {
        /// Include books without highlights
        #[arg(short, long)]
        all: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (vault_dir, highlights_folder, insights_folder,
        /// kobo_db, sort_order, import_all_books, log_file)
        key: String,
        /// Configuration value (empty clears optional keys)
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_deref();

    // Config commands work without opening the vault
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    logging::init_logging(&config);
    let mut store = Store::open_with_config(config)?;

    match cli.command {
        Commands::Import {
            book,
            all_books,
            order,
        } => {
            let options = ImportOptions {
                book,
                all_books: all_books.then_some(true),
                order,
            };
            commands::import::run(&mut store, options, &output)
        }
        Commands::Extract { book } => commands::extract::run(&mut store, book.as_deref(), &output),
        Commands::Stats { book, refresh } => {
            commands::stats::run(&mut store, book.as_deref(), refresh, &output)
        }
        Commands::Books { all } => commands::books::list(&store, all, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&Path>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(&key, &value, config_path, output)
        }
    }
}
