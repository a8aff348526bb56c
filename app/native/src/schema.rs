//! JSON Schema for the Reel configuration file.

use crate::config::ReelConfig;

const SCHEMA_ID: &str = "https://raw.githubusercontent.com/reel-editor/reel/main/reel.schema.json";

/// Generates a JSON Schema for the Reel configuration.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(ReelConfig);

    if let Some(obj) = schema.as_object_mut() {
        obj.insert("$id".to_string(), serde_json::json!(SCHEMA_ID));
    }

    schema
}

/// Pretty-printed JSON Schema for the Reel configuration.
#[must_use]
pub fn print_schema() -> String {
    serde_json::to_string_pretty(&generate_schema()).unwrap_or_default()
}
