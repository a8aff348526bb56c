//! Structural description of a timeline.
//!
//! A description is an ordered list of item records. It is accepted either as
//! a bare JSON array or as an object with an `items` array, which is the
//! form [`to_description`] produces:
//!
//! ```json
//! { "items": [ { "id": "…", "type": "clip", "name": "A001", "content": {} } ] }
//! ```
//!
//! `id` and `type` are required. `name` and `content` are optional; content
//! is opaque and carried through unchanged.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::TimelineError;

/// Kind of an item in the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Clip,
    Gap,
    Track,
    Stack,
    Marker,
}

impl ItemType {
    /// Returns the tag used in descriptions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clip => "clip",
            Self::Gap => "gap",
            Self::Track => "track",
            Self::Stack => "stack",
            Self::Marker => "marker",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// One record of a structural description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub item_type: ItemType,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub content: Value,
}

impl ItemRecord {
    /// Creates an unnamed record with a fresh id and no content.
    #[must_use]
    pub fn new(item_type: ItemType) -> Self {
        Self {
            id: Uuid::now_v7(),
            item_type,
            name: String::new(),
            content: Value::Null,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: Value) -> Self {
        self.content = content;
        self
    }
}

/// Parses and validates a structural description.
///
/// # Errors
///
/// Returns [`TimelineError::MalformedStructure`] if the value is neither an
/// array nor an object with an `items` array, if a record is missing `id` or
/// `type` or has the wrong shape, or if two records share an id.
pub fn parse_description(description: &Value) -> Result<Vec<ItemRecord>, TimelineError> {
    let records = match description {
        Value::Array(records) => records,
        Value::Object(map) => match map.get("items") {
            Some(Value::Array(records)) => records,
            Some(_) => return Err(malformed("'items' must be an array")),
            None => return Err(malformed("missing 'items' array")),
        },
        _ => return Err(malformed("expected an array or an object with 'items'")),
    };

    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let record = ItemRecord::deserialize(raw)
                .map_err(|err| malformed(format!("record {index}: {err}")))?;
            if !seen.insert(record.id) {
                return Err(malformed(format!("record {index}: duplicate id {}", record.id)));
            }
            Ok(record)
        })
        .collect()
}

/// Renders records as a description in the `{ "items": [...] }` form.
#[must_use]
pub fn to_description(records: &[ItemRecord]) -> Value {
    serde_json::json!({ "items": records })
}

fn malformed(reason: impl Into<String>) -> TimelineError {
    TimelineError::MalformedStructure(reason.into())
}
