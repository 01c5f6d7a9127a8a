//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use adlayer::config::ConfigDecodeError;
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Failed to read a configuration file
    ConfigRead { path: String, error: std::io::Error },
    /// Failed to decode a configuration document
    ConfigDecode(ConfigDecodeError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::ConfigDecode(_) = self {
            eprintln!();
            eprintln!("The document must be JSON with a top-level \"enabled\" flag and");
            eprintln!("per-category placement collections. Run with a known-good file");
            eprintln!("or compare against the bundled demo configuration.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::ConfigRead { path, error } => {
                write!(f, "Failed to read configuration '{}': {}", path, error)
            }
            CliError::ConfigDecode(e) => write!(f, "Failed to decode configuration: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Runtime(e) => Some(e),
            CliError::ConfigRead { error, .. } => Some(error),
            CliError::ConfigDecode(e) => Some(e),
            _ => None,
        }
    }
}
