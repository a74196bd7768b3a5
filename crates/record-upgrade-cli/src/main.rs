use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// rup: Development tool for versioned records.
///
/// Upgrade single records, inspect step chains, and check schema catalogs
/// against the built-in donor steps.
#[derive(Parser)]
#[command(name = "rup", version, about, long_about = None)]
struct Cli {
    /// Log every applied step (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upgrade one record read from a JSON file.
    Upgrade {
        /// Path to a bare record or a versioned envelope.
        file: PathBuf,

        /// Record type name.
        #[arg(long = "type")]
        type_name: String,

        /// Version a bare record is stored at.
        #[arg(long)]
        from: Option<u32>,

        /// Target version. Defaults to the catalog's current version.
        #[arg(long)]
        to: Option<u32>,

        /// Schema catalog TOML. Defaults to the built-in donor catalog.
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// JSON object mapping references to the records they resolve to.
        #[arg(long)]
        context: Option<PathBuf>,

        /// Print the result on a single line.
        #[arg(long)]
        compact: bool,
    },

    /// List the registered steps of a type and report gaps.
    Chain {
        /// Record type name.
        #[arg(long = "type")]
        type_name: String,

        /// Schema catalog TOML. Defaults to the built-in donor catalog.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Validate a schema catalog against the built-in steps.
    Check {
        /// Schema catalog TOML. Defaults to the built-in donor catalog.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Upgrade {
            file,
            type_name,
            from,
            to,
            catalog,
            context,
            compact,
        } => commands::upgrade(commands::UpgradeArgs {
            file: &file,
            type_name: &type_name,
            from,
            to,
            catalog: catalog.as_deref(),
            context: context.as_deref(),
            compact,
        }),
        Commands::Chain { type_name, catalog } => commands::chain(&type_name, catalog.as_deref()),
        Commands::Check { catalog } => commands::check(catalog.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
