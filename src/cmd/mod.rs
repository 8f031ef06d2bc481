mod check;
mod expand;
mod tables;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "schema-flatten")]
#[command(author = "Helge Sverre <helge.sverre@gmail.com>")]
#[command(version)]
#[command(about = "Flatten reference fields in schema documentation into browsable exports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Expand reference columns and export the flattened documentation
    Expand {
        /// Documentation database (DuckDB file)
        db: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: table, csv, tsv, json, jsonl (detected from output extension if not specified)
        #[arg(short, long)]
        format: Option<String>,

        /// Maximum reference hops per expansion path
        #[arg(long, default_value_t = 5)]
        max_depth: usize,

        /// Spaces of indentation per expansion depth level
        #[arg(long, default_value_t = 4)]
        indent_width: usize,

        /// Referenced-table fields to include: keys-or-display, keys, display, all
        #[arg(long, default_value = "keys-or-display")]
        fields: String,

        /// Only export specific tables (comma-separated, glob patterns supported)
        #[arg(short, long)]
        tables: Option<String>,

        /// Exclude specific tables (comma-separated, glob patterns supported)
        #[arg(short, long)]
        exclude: Option<String>,

        /// Include hidden identity columns in table/csv/tsv output
        #[arg(long)]
        include_hidden: bool,

        /// Write the flattened rows back to the doc_expanded store table
        #[arg(long)]
        to_store: bool,

        /// Show progress during expansion
        #[arg(short, long)]
        progress: bool,
    },

    /// List documented tables with column and reference counts
    Tables {
        /// Documentation database (DuckDB file)
        db: PathBuf,

        /// Output results as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Check the documented schema for reference cycles and defects
    Check {
        /// Documentation database (DuckDB file)
        db: PathBuf,

        /// Output results as JSON instead of human-readable text
        #[arg(long)]
        json: bool,

        /// Exit non-zero when any schema issue is found
        #[arg(long)]
        strict: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Expand {
            db,
            output,
            format,
            max_depth,
            indent_width,
            fields,
            tables,
            exclude,
            include_hidden,
            to_store,
            progress,
        } => expand::run(
            db,
            output,
            format,
            max_depth,
            indent_width,
            fields,
            tables,
            exclude,
            include_hidden,
            to_store,
            progress,
        ),
        Commands::Tables { db, json } => tables::run(db, json),
        Commands::Check { db, json, strict } => check::run(db, json, strict),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "schema-flatten",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}
