//! Timeline CLI commands.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use crate::cli::output;
use crate::config;
use crate::error::ReelError;
use crate::modules::timeline::actor::TimelineInfo;
use crate::modules::timeline::{ItemRecord, TimelineActor, TimelineHandle, structure};

/// Timeline subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum TimelineCommands {
    /// Load a structural description into a timeline and print it.
    ///
    /// The file holds a JSON array of item records, or an object with an
    /// `items` array. Comments are allowed. After loading, the timeline's
    /// own description is applied again to check that ids, order and types
    /// survive the round trip.
    #[command(after_long_help = r"Examples:
  reel timeline inspect cut.json
  reel timeline inspect cut.json --json
  reel timeline inspect cut.json --replace   # rebuild items on the second pass")]
    Inspect {
        /// Path to the structural description.
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output in JSON format instead of a table.
        #[arg(long, short = 'j')]
        json: bool,

        /// Rebuild every item with a fresh actor on the second pass instead
        /// of refreshing it in place.
        #[arg(long)]
        replace: bool,
    },
}

/// Execute timeline subcommands.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a valid description,
/// or the timeline rejects it.
pub fn execute(cmd: &TimelineCommands) -> Result<(), ReelError> {
    match cmd {
        TimelineCommands::Inspect { file, json, replace } => inspect(file, *json, *replace),
    }
}

/// Result of loading a description.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectReport {
    timeline: TimelineInfo,
    round_trip: bool,
    description: Value,
    #[serde(skip)]
    records: Vec<ItemRecord>,
}

fn inspect(file: &Path, json: bool, replace: bool) -> Result<(), ReelError> {
    let description = read_description(file)?;
    let report = super::block_on(load(description, replace))??;

    if json {
        output::print_highlighted_json(&serde_json::to_value(&report)?);
    } else {
        print_report(&report);
    }

    if report.round_trip {
        Ok(())
    } else {
        Err(ReelError::TimelineError(
            "the description did not survive a serialize/deserialize round trip".to_string(),
        ))
    }
}

fn read_description(file: &Path) -> Result<Value, ReelError> {
    let text = fs::read_to_string(file).map_err(|err| {
        ReelError::InvalidArguments(format!("cannot read {}: {err}", file.display()))
    })?;
    let reader = json_comments::StripComments::new(text.as_bytes());
    Ok(serde_json::from_reader(reader)?)
}

async fn load(description: Value, replace: bool) -> Result<InspectReport, ReelError> {
    let timeline = TimelineActor::spawn_from_config(&config::init().timeline);
    let report = load_into(&timeline, description, replace).await;
    let _ = timeline.shutdown().await;
    report
}

async fn load_into(
    timeline: &TimelineHandle,
    description: Value,
    replace: bool,
) -> Result<InspectReport, ReelError> {
    timeline.deserialize(description, false).await?;
    let loaded = timeline.serialize().await?;

    timeline.deserialize(structure::to_description(&loaded), replace).await?;
    let records = timeline.serialize().await?;

    Ok(InspectReport {
        timeline: timeline.info().await?,
        round_trip: same_structure(&loaded, &records),
        description: structure::to_description(&records),
        records,
    })
}

/// Same ids and types in the same order.
fn same_structure(a: &[ItemRecord], b: &[ItemRecord]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| x.id == y.id && x.item_type == y.item_type)
}

fn print_report(report: &InspectReport) {
    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "#")]
        index: usize,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Type")]
        item_type: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Content")]
        content: String,
    }

    let info = &report.timeline;
    println!("{} {}", info.name.bold(), info.id.to_string().dimmed());

    if report.records.is_empty() {
        println!("{}", "No items.".dimmed());
    } else {
        let rows: Vec<ItemRow> = report
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| ItemRow {
                index,
                id: record.id.to_string(),
                item_type: record.item_type.to_string(),
                name: output::or_dash(&record.name),
                content: if record.content.is_null() {
                    output::or_dash("")
                } else {
                    output::truncate(&record.content.to_string(), 40)
                },
            })
            .collect();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::first()).with(Alignment::right()))
            .to_string();

        println!("{}", format!("Items ({})", info.items).bold());
        println!("{table}");
    }

    println!("Unsaved changes: {}", output::format_bool(info.content_changed));
    println!("Round trip:      {}", output::format_bool(report.round_trip));
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::modules::timeline::ItemType;

    fn cut() -> Value {
        json!([
            { "id": "0190f5a4-0000-7000-8000-000000000001", "type": "track", "name": "V1" },
            { "id": "0190f5a4-0000-7000-8000-000000000002", "type": "clip", "content": { "in": 0 } },
            { "id": "0190f5a4-0000-7000-8000-000000000003", "type": "gap" },
        ])
    }

    #[test]
    fn test_read_description_accepts_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.jsonc");
        fs::write(&path, "// cut\n{ \"items\": [] }").unwrap();

        assert_eq!(read_description(&path).unwrap(), json!({ "items": [] }));
    }

    #[test]
    fn test_read_description_missing_file() {
        let err = read_description(Path::new("/nonexistent/cut.json")).unwrap_err();
        assert!(matches!(err, ReelError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_load_round_trips_in_place() {
        let report = load(cut(), false).await.unwrap();

        assert!(report.round_trip);
        assert_eq!(report.timeline.items, 3);
        assert!(report.timeline.content_changed);
        assert_eq!(report.records[1].item_type, ItemType::Clip);
        assert_eq!(report.description["items"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_load_round_trips_with_replace() {
        let report = load(cut(), true).await.unwrap();
        assert!(report.round_trip);
        assert_eq!(report.records[0].name, "V1");
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_description() {
        let err = load(json!({ "items": [{ "type": "clip" }] }), false).await.unwrap_err();
        assert!(matches!(err, ReelError::TimelineError(_)));
    }

    #[test]
    fn test_same_structure_compares_ids_and_types() {
        let a = vec![ItemRecord::new(ItemType::Clip), ItemRecord::new(ItemType::Gap)];
        let mut b = a.clone();
        assert!(same_structure(&a, &b));

        b[1].name = "renamed".to_string();
        assert!(same_structure(&a, &b));

        b.swap(0, 1);
        assert!(!same_structure(&a, &b));
    }
}
