//! AdLayer CLI - Command-line interface
//!
//! This binary provides a demonstration harness for the adlayer library:
//! a scripted ad session against the simulated provider, and a decoder for
//! configuration documents.

use clap::{Parser, Subcommand};

mod commands;
mod error;

use commands::placements::PlacementsArgs;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "adlayer")]
#[command(about = "Ad slot coordination demo harness", long_about = None)]
#[command(version = adlayer::VERSION)]
struct Cli {
    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scripted ad session against the simulated provider
    Simulate(SimulateArgs),
    /// Decode a configuration document and print its placement table
    Placements(PlacementsArgs),
}

fn main() {
    let cli = Cli::parse();

    // The guard flushes the log file when dropped; keep it for the whole run.
    let _guard = match adlayer::logging::init_logging(&cli.log_dir, "adlayer.log") {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    let result = match cli.command {
        Command::Simulate(args) => commands::simulate::run(args),
        Command::Placements(args) => commands::placements::run(&args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
