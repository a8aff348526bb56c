//! Hotkey CLI commands.

use clap::Args;
use colored::Colorize;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use crate::cli::output;
use crate::config::{self, HotkeyConfig};
use crate::error::ReelError;
use crate::modules::hotkeys::{self, HotkeyInfo, KeypressMonitor, keys};

/// Arguments of `reel hotkeys`.
#[derive(Args, Debug)]
pub struct HotkeysArgs {
    /// Output in JSON format instead of a table.
    #[arg(long, short = 'j')]
    pub json: bool,

    /// Fail on the first hotkey whose sequence cannot be parsed instead of
    /// skipping it.
    #[arg(long)]
    pub strict: bool,
}

/// List the configured hotkeys.
///
/// # Errors
///
/// Returns an error in strict mode if a sequence is invalid, or if the
/// keypress monitor cannot be queried.
pub fn execute(args: &HotkeysArgs) -> Result<(), ReelError> {
    let entries = &config::init().hotkeys;
    if args.strict {
        validate(entries)?;
    }

    let infos = super::block_on(registered(entries))??;

    if args.json {
        output::print_highlighted_json(&serde_json::to_value(&infos)?);
    } else {
        print_table(&infos);
    }
    Ok(())
}

fn validate(entries: &[HotkeyConfig]) -> Result<(), ReelError> {
    for entry in entries {
        keys::parse_sequence(&entry.sequence).map_err(|err| {
            ReelError::HotkeyError(format!("'{}' ({}): {err}", entry.name, entry.sequence))
        })?;
    }
    Ok(())
}

/// Registers the entries with a keypress monitor and reads them back.
async fn registered(entries: &[HotkeyConfig]) -> Result<Vec<HotkeyInfo>, ReelError> {
    let monitor = KeypressMonitor::spawn_with(hotkeys::from_config(entries));
    let infos = monitor.hotkeys().await;
    let _ = monitor.shutdown();
    Ok(infos?)
}

fn print_table(infos: &[HotkeyInfo]) {
    #[derive(Tabled)]
    struct HotkeyRow {
        #[tabled(rename = "Sequence")]
        sequence: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Component")]
        component: String,
        #[tabled(rename = "Context")]
        context: String,
        #[tabled(rename = "Repeat")]
        auto_repeat: String,
        #[tabled(rename = "Description")]
        description: String,
        #[tabled(rename = "ID")]
        id: String,
    }

    if infos.is_empty() {
        println!("{}", "No hotkeys configured.".dimmed());
        return;
    }

    let rows: Vec<HotkeyRow> = infos
        .iter()
        .map(|info| HotkeyRow {
            sequence: info.sequence.clone(),
            name: info.name.clone(),
            component: output::or_dash(&info.component),
            context: output::or_dash(&info.context),
            auto_repeat: output::format_bool(info.auto_repeat),
            description: output::truncate(&info.description, 48),
            id: info.id.to_string(),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..5)).with(Alignment::center()))
        .to_string();

    println!("{}", format!("Hotkeys ({})", infos.len()).bold());
    println!("{table}");
}
