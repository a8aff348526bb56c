//! Config CLI commands.

use std::fs;
use std::path::PathBuf;

use clap::Subcommand;
use colored::Colorize;

use crate::cli::output;
use crate::config::{self, ReelConfig, config_paths};
use crate::error::ReelError;

/// Config management commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ConfigCommands {
    /// Write a configuration file populated with the default values.
    #[command(after_long_help = r"Examples:
  reel config init              # Create config at default location
  reel config init --force      # Overwrite existing config
  reel config init --stdout     # Print the defaults to stdout")]
    Init {
        /// Overwrite an existing configuration file.
        #[arg(long, short)]
        force: bool,

        /// Custom path for the configuration file.
        #[arg(long, short, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Print the defaults instead of writing a file.
        #[arg(long)]
        stdout: bool,
    },

    /// Show where Reel looks for its configuration file.
    Path,

    /// Print the effective configuration as JSON.
    Show,
}

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cmd: &ConfigCommands) -> Result<(), ReelError> {
    match cmd {
        ConfigCommands::Init { force, path, stdout } => {
            if *stdout {
                println!("{}", default_config_json()?);
                Ok(())
            } else {
                init_config(*force, path.clone())
            }
        }
        ConfigCommands::Path => {
            show_config_path();
            Ok(())
        }
        ConfigCommands::Show => {
            let value = serde_json::to_value(config::init())?;
            output::print_highlighted_json(&value);
            Ok(())
        }
    }
}

fn default_config_json() -> Result<String, ReelError> {
    Ok(serde_json::to_string_pretty(&ReelConfig::default())?)
}

fn init_config(force: bool, custom_path: Option<PathBuf>) -> Result<(), ReelError> {
    let target = custom_path
        .or_else(|| config_paths().into_iter().next())
        .unwrap_or_else(|| PathBuf::from("config.jsonc"));

    if target.exists() && !force {
        return Err(ReelError::ConfigError(format!(
            "Configuration file already exists at: {}\nUse --force to overwrite.",
            target.display()
        )));
    }

    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, default_config_json()?)?;

    println!("Configuration file created at: {}", target.display());
    Ok(())
}

fn show_config_path() {
    println!("Configuration file search paths (in priority order):\n");

    let active = loaded_config_path();

    if let Some(custom) = config::custom_config_path() {
        let marker = if active.as_ref() == Some(custom) {
            " (active)".green().to_string()
        } else {
            String::new()
        };
        println!("  {} {}{marker}", "--config".bold(), custom.display());
    }

    for (i, path) in config_paths().iter().enumerate() {
        let marker = if active.as_ref() == Some(path) {
            " (active)".green().to_string()
        } else if path.exists() {
            " (exists)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("  {}. {}{marker}", i + 1, path.display());
    }

    if active.is_none() {
        println!("\nNo configuration file loaded, defaults are in effect.");
        println!("Run 'reel config init' to create one.");
    }
}

/// Path of the file the global configuration was actually read from.
fn loaded_config_path() -> Option<PathBuf> {
    config::init();
    config::get_config_path().cloned()
}
