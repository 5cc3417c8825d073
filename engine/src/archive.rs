//! Archive change entries.
//!
//! The source application appends one entry per change it makes to its
//! recipe collection. Entries are authoritative in file order.

use crate::node::text_of;
use crate::{error::Result, Error, Timestamp};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What an archive entry did.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArchiveAction {
    AddRecipe,
    InsertPaste,
    Edit,
    Move,
    DeleteCut,
    Paste,
    /// An action name this engine does not know.
    Unknown(String),
}

impl ArchiveAction {
    pub fn as_str(&self) -> &str {
        match self {
            ArchiveAction::AddRecipe => "Add Recipe",
            ArchiveAction::InsertPaste => "Insert/Paste",
            ArchiveAction::Edit => "Edit",
            ArchiveAction::Move => "Move",
            ArchiveAction::DeleteCut => "Delete/Cut",
            ArchiveAction::Paste => "Paste",
            ArchiveAction::Unknown(action) => action,
        }
    }
}

impl From<&str> for ArchiveAction {
    fn from(action: &str) -> Self {
        match action.trim() {
            "Add Recipe" => ArchiveAction::AddRecipe,
            "Insert/Paste" => ArchiveAction::InsertPaste,
            "Edit" => ArchiveAction::Edit,
            "Move" => ArchiveAction::Move,
            "Delete/Cut" => ArchiveAction::DeleteCut,
            "Paste" => ArchiveAction::Paste,
            other => ArchiveAction::Unknown(other.to_string()),
        }
    }
}

impl From<String> for ArchiveAction {
    fn from(action: String) -> Self {
        ArchiveAction::from(action.as_str())
    }
}

impl From<ArchiveAction> for String {
    fn from(action: ArchiveAction) -> Self {
        action.as_str().to_string()
    }
}

impl std::fmt::Display for ArchiveAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change recorded in the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub action: ArchiveAction,
    /// Recipe name the change applied to.
    pub name: String,
    /// Export file holding the recipe after the change.
    pub file: String,
    /// Folder of the recipe; not used for replay.
    pub directory: Option<String>,
    pub date: Timestamp,
}

impl ArchiveEntry {
    pub fn new(
        action: impl Into<ArchiveAction>,
        name: impl Into<String>,
        file: impl Into<String>,
        date: Timestamp,
    ) -> Self {
        Self {
            action: action.into(),
            name: name.into(),
            file: file.into(),
            directory: None,
            date,
        }
    }

    /// Read an entry from a raw archive node.
    pub fn from_node(node: &Map<String, Value>) -> Result<Self> {
        let field = |key: &str| text_of(node.get(key));

        let action = field("action")
            .ok_or_else(|| Error::InvalidArchiveEntry("missing action".into()))?;
        let name = field("name")
            .ok_or_else(|| Error::InvalidArchiveEntry(format!("{} entry has no name", action)))?;
        let date = field("date")
            .or_else(|| field("f_ar_date"))
            .ok_or_else(|| Error::InvalidArchiveEntry(format!("entry for '{}' has no date", name)))?;

        Ok(Self {
            action: ArchiveAction::from(action),
            file: field("file").unwrap_or_default(),
            directory: field("directory"),
            date: parse_timestamp(&date)?,
            name,
        })
    }
}

/// Date-time layouts accepted without an offset, read as local time.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse an archive or window timestamp.
///
/// The exporter writes wall-clock times without an offset; those are
/// resolved in the local zone so they compare against `Utc::now()`.
pub fn parse_timestamp(text: &str) -> Result<Timestamp> {
    let text = text.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return from_local(parsed).ok_or_else(|| Error::InvalidDate(text.to_string()));
        }
    }
    for format in NAIVE_DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
            if let Some(midnight) = parsed.and_hms_opt(0, 0, 0).and_then(from_local) {
                return Ok(midnight);
            }
        }
    }

    Err(Error::InvalidDate(text.to_string()))
}

/// Resolve a local wall-clock time. In a DST fold the earlier instant wins;
/// a time skipped by a DST gap is shifted forward an hour.
fn from_local(naive: NaiveDateTime) -> Option<Timestamp> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|local| local.with_timezone(&Utc))
}
