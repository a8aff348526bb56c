//! Command-line interface for Reel.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;

use crate::error::ReelError;

/// Parses the process arguments and runs the selected command.
///
/// # Errors
///
/// Returns an error if the command fails.
pub fn run() -> Result<(), ReelError> {
    let cli = Cli::parse();
    cli.execute()
}
