//! Structured overrides hidden in free-text notes.
//!
//! Brewers can type Hjson into a notes field (`{ brewer: Romano }`) to add
//! or override fields on the record that holds it. Most notes are prose,
//! so failing to parse is the normal case and never an error.

use serde_json::{Map, Value};

/// What a notes field turned out to contain.
#[derive(Debug, Clone, PartialEq)]
pub enum Notes {
    /// A mapping of fields to merge onto the enclosing record.
    Structured(Map<String, Value>),
    /// Anything else, kept verbatim.
    Raw(String),
}

impl Notes {
    /// Parse notes text with relaxed Hjson syntax.
    ///
    /// The root braces are optional, as Hjson allows: `brewer: Romano` on
    /// its own is a mapping.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Notes::Raw(text.to_string());
        }

        let parsed = match parse_mapping(text) {
            Some(fields) => Some(fields),
            None if !trimmed.starts_with('{') => parse_mapping(&format!("{{\n{}\n}}", text)),
            None => None,
        };

        match parsed {
            Some(fields) => Notes::Structured(fields),
            None => Notes::Raw(text.to_string()),
        }
    }

    /// Parse the `notes` field of a record, if it holds any text.
    pub fn of_record(record: &Map<String, Value>) -> Option<Self> {
        match record.get("notes") {
            Some(Value::String(text)) if !text.is_empty() => Some(Self::parse(text)),
            _ => None,
        }
    }

    /// Merge structured notes onto `record`, last writer wins.
    ///
    /// Returns whether anything was merged.
    pub fn merge_into(self, record: &mut Map<String, Value>) -> bool {
        match self {
            Notes::Structured(fields) => {
                record.extend(fields);
                true
            }
            Notes::Raw(_) => false,
        }
    }
}

fn parse_mapping(text: &str) -> Option<Map<String, Value>> {
    match deser_hjson::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => Some(fields),
        Ok(_) => None,
        Err(e) => {
            tracing::trace!("notes are not structured: {}", e);
            None
        }
    }
}

/// Apply a record's own structured notes to it.
pub fn apply_notes(record: &mut Map<String, Value>) -> bool {
    match Notes::of_record(record) {
        Some(notes) => notes.merge_into(record),
        None => false,
    }
}
