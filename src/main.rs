use clap::{Parser, Subcommand, ValueEnum};
use stitch::core::StitchError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "stitch")]
#[command(about = "Compile-time dependency injection resolver and code generator")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./stitch.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show informational diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a setup document and write the generated statements
    Generate {
        /// Setup document
        setup: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,
        /// Write output here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Also write the dependency graph snapshot (JSON) to this file
        #[arg(long)]
        graph: Option<PathBuf>,
    },
    /// Resolve a setup document and report diagnostics only
    Check {
        /// Setup document
        setup: PathBuf,
    },
    /// Print the dependency graph of a setup document
    Graph {
        /// Setup document
        setup: PathBuf,
        /// Render as Graphviz instead of JSON
        #[arg(long)]
        dot: bool,
    },
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = cli::Options {
        config: cli.config,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Commands::Generate {
            setup,
            format,
            out,
            graph,
        } => cli::generate::run(&options, &setup, format, out.as_deref(), graph.as_deref()),
        Commands::Check { setup } => cli::check::run(&options, &setup),
        Commands::Graph { setup, dot } => cli::graph::run(&options, &setup, dot),
    };

    // Handle result and exit codes
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match &e {
            StitchError::GenerationFailed(_) => {
                // Diagnostics were already printed
                ExitCode::FAILURE
            }
            _ => {
                eprintln!("\nError: {}", e);
                ExitCode::from(2)
            }
        },
    }
}
