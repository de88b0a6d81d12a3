// orglens CLI - config-driven hierarchy aggregation and cross-referencing

mod exit_codes;
mod ops;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "olens")]
#[command(about = "Aggregate personnel snapshots and cross-reference people across systems")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one ingestion + resolution cycle from a TOML config
    #[command(after_help = "\
Examples:
  olens run orglens.toml
  olens run orglens.toml --json
  olens run orglens.toml --output cycle.json
  olens run orglens.toml --timeout-ms 5000")]
    Run {
        /// Path to the orglens TOML config file
        config: PathBuf,

        /// Output the full cycle outcome as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write the cycle outcome JSON to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Wall-clock budget for the cycle, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Validate a config without loading any snapshots
    #[command(after_help = "\
Examples:
  olens validate orglens.toml")]
    Validate {
        /// Path to the orglens TOML config file
        config: PathBuf,
    },

    /// Run a cycle and query the resulting index
    #[command(after_help = "\
Examples:
  olens query orglens.toml --department Marketing
  olens query orglens.toml --leadership --system orgchart
  olens query orglens.toml --name-contains chen")]
    Query {
        /// Path to the orglens TOML config file
        config: PathBuf,

        /// Only records in this department (case-insensitive)
        #[arg(long)]
        department: Option<String>,

        /// Only records from this source system
        #[arg(long)]
        system: Option<String>,

        /// Only leadership-classified records
        #[arg(long)]
        leadership: bool,

        /// Only manager-classified records
        #[arg(long)]
        managers: bool,

        /// Only records whose name contains this fragment (case-insensitive)
        #[arg(long, value_name = "FRAGMENT")]
        name_contains: Option<String>,
    },

    /// Run a cycle and materialize a named view
    #[command(after_help = "\
Examples:
  olens view orglens.toml organizational
  olens view orglens.toml source:ladder
  olens view orglens.toml department
  olens view orglens.toml leadership")]
    View {
        /// Path to the orglens TOML config file
        config: PathBuf,

        /// View name: source:<system>, organizational, department,
        /// leadership or managers
        name: String,
    },

    /// Run a cycle and print the inferred cross-references
    #[command(after_help = "\
Examples:
  olens xrefs orglens.toml
  olens xrefs orglens.toml --min-confidence 0.9")]
    Xrefs {
        /// Path to the orglens TOML config file
        config: PathBuf,

        /// Only clusters at or above this confidence
        #[arg(long)]
        min_confidence: Option<f64>,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RUNTIME, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, json, output, timeout_ms } => {
            ops::cmd_run(config, json, output, timeout_ms)
        }
        Commands::Validate { config } => ops::cmd_validate(config),
        Commands::Query {
            config,
            department,
            system,
            leadership,
            managers,
            name_contains,
        } => ops::cmd_query(config, department, system, leadership, managers, name_contains),
        Commands::View { config, name } => ops::cmd_view(config, name),
        Commands::Xrefs { config, min_confidence } => ops::cmd_xrefs(config, min_confidence),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            eprintln!("error: {message}");
            if let Some(hint) = hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(code)
        }
    }
}
