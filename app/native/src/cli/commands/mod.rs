//! CLI command definitions using Clap.
//!
//! - `hotkeys` - list configured hotkeys
//! - `timeline` - load and inspect structural descriptions
//! - `config_cmd` - configuration file management

use std::io;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use crate::error::ReelError;
use crate::{config, schema};

pub mod config_cmd;
pub mod hotkeys;
pub mod timeline;

pub use config_cmd::ConfigCommands;
pub use hotkeys::HotkeysArgs;
pub use timeline::TimelineCommands;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reel - timeline documents and hotkeys from the command line.
#[derive(Parser, Debug)]
#[command(name = "reel")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// List configured hotkeys.
    ///
    /// Every binding from the configuration file is registered with a
    /// keypress monitor and listed with its id, rendered sequence and
    /// context.
    Hotkeys(HotkeysArgs),

    /// Timeline commands.
    #[command(subcommand)]
    Timeline(TimelineCommands),

    /// Configuration file management commands.
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Output the Reel configuration JSON Schema.
    ///
    /// Can be redirected to a file for use with editors that support JSON
    /// Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Usage:
    ///   eval "$(reel completions --shell zsh)"
    ///   reel completions --shell fish > ~/.config/fish/completions/reel.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<std::path::PathBuf> {
        self.config.as_ref().map(std::path::PathBuf::from)
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), ReelError> {
        if let Some(path) = self.config_path() {
            if !path.exists() {
                return Err(ReelError::ConfigError(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            config::set_custom_config_path(path);
        }

        match &self.command {
            Commands::Hotkeys(args) => hotkeys::execute(args),
            Commands::Timeline(cmd) => timeline::execute(cmd),
            Commands::Config(cmd) => config_cmd::execute(cmd),

            Commands::Schema => {
                println!("{}", schema::print_schema());
                Ok(())
            }

            Commands::Completions { shell } => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "reel", &mut io::stdout());
    }
}

/// Runs a future to completion on a fresh single-threaded runtime.
///
/// Commands that talk to actors use this, since the CLI itself is
/// synchronous.
fn block_on<F: Future>(future: F) -> Result<F::Output, ReelError> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
    Ok(runtime.block_on(future))
}
