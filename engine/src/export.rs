//! Reading export files.
//!
//! An export is either a folder tree of recipes (root `<Selections>` or
//! `<Recipe>`) or a run of archive entries (root `<Archive>`, repeated).
//! Text is cleaned up before parsing: a fixed set of tags is renamed and
//! entities the exporter leaves unescaped are made well formed.

use crate::archive::ArchiveEntry;
use crate::folder::Folder;
use crate::node::Siblings;
use crate::recipe::Recipe;
use crate::xml::parse_document;
use crate::{error::Result, Error};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::io;

/// Literal tag renames, applied in order to the raw text.
pub const TAG_RENAMES: &[(&str, &str)] = &[
    ("_MOD_", "last_modified"),
    ("_TExpanded", "texpanded"),
    ("_XName", "xname"),
    ("F_R_NAME", "name"),
    ("F_AR_ACTION", "action"),
    ("F_AR_NAME", "name"),
    ("F_AR_DIRECTORY", "directory"),
    ("F_AR_FILE", "file"),
];

/// Synthetic root wrapped around archive exports.
const ARCHIVE_WRAPPER: &str = "root";

static ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+;|#[xX][0-9a-fA-F]+;|[A-Za-z][A-Za-z0-9]*;)?")
        .expect("valid entity regex")
});

/// HTML named entities that show up in recipe text, as code points.
const HTML_ENTITIES: &[(&str, u32)] = &[
    ("nbsp", 0xA0),
    ("deg", 0xB0),
    ("frac14", 0xBC),
    ("frac12", 0xBD),
    ("frac34", 0xBE),
    ("lsquo", 0x2018),
    ("rsquo", 0x2019),
    ("ldquo", 0x201C),
    ("rdquo", 0x201D),
    ("ndash", 0x2013),
    ("mdash", 0x2014),
    ("hellip", 0x2026),
    ("times", 0xD7),
    ("plusmn", 0xB1),
    ("micro", 0xB5),
    ("copy", 0xA9),
    ("reg", 0xAE),
];

/// Apply [`TAG_RENAMES`] to raw export text.
pub fn apply_renames(text: &str) -> String {
    TAG_RENAMES
        .iter()
        .fold(text.to_string(), |text, (from, to)| text.replace(from, to))
}

/// Make every `&` in `text` part of a well-formed XML reference.
///
/// XML's own entities and numeric references pass through, known HTML
/// entities become numeric references and anything else is escaped.
pub fn sanitize_entities(text: &str) -> String {
    ENTITY_REGEX
        .replace_all(text, |caps: &Captures<'_>| {
            let Some(reference) = caps.get(1) else {
                return "&amp;".to_string();
            };
            let reference = reference.as_str();
            let name = &reference[..reference.len() - 1];

            if name.starts_with('#') || matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
                return format!("&{}", reference);
            }
            match HTML_ENTITIES.iter().find(|(entity, _)| *entity == name) {
                Some((_, code)) => format!("&#{};", code),
                None => format!("&amp;{}", reference),
            }
        })
        .into_owned()
}

/// Escape every `<` that cannot open markup.
///
/// Free text such as `OG < 1.050` would otherwise start an element and
/// swallow everything after it. Markup starts with a name character, `/`,
/// `!` or `?`.
pub fn escape_stray_brackets(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let opens_markup = matches!(
            chars.peek(),
            Some(next) if next.is_ascii_alphabetic() || matches!(next, '_' | '/' | '!' | '?')
        );
        if c == '<' && !opens_markup {
            out.push_str("&lt;");
        } else {
            out.push(c);
        }
    }
    out
}

fn sanitize(text: &str) -> String {
    sanitize_entities(&escape_stray_brackets(text))
}

/// The kind of document an export holds, from its root tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Selections,
    Recipe,
    Archive,
}

impl ExportKind {
    /// Detect the root tag, skipping a byte order mark, whitespace and an
    /// XML declaration.
    pub fn detect(text: &str) -> Option<Self> {
        let mut body = text.trim_start_matches('\u{feff}').trim_start();
        if body.starts_with("<?") {
            body = body.split_once("?>").map(|(_, rest)| rest)?.trim_start();
        }

        if body.starts_with("<Selections>") {
            Some(ExportKind::Selections)
        } else if body.starts_with("<Recipe>") {
            Some(ExportKind::Recipe)
        } else if body.starts_with("<Archive>") {
            Some(ExportKind::Archive)
        } else {
            None
        }
    }
}

/// Parsed contents of one export file.
#[derive(Debug, Clone, PartialEq)]
pub enum Export {
    Recipes(Vec<Recipe>),
    Archive(Vec<ArchiveEntry>),
    /// Nothing usable: missing, empty or unrecognized.
    Empty,
}

impl Export {
    pub fn into_recipes(self) -> Vec<Recipe> {
        match self {
            Export::Recipes(recipes) => recipes,
            Export::Archive(_) => {
                tracing::warn!("expected recipes but found an archive");
                Vec::new()
            }
            Export::Empty => Vec::new(),
        }
    }

    pub fn into_archive(self) -> Vec<ArchiveEntry> {
        match self {
            Export::Archive(entries) => entries,
            Export::Recipes(_) => {
                tracing::warn!("expected an archive but found recipes");
                Vec::new()
            }
            Export::Empty => Vec::new(),
        }
    }
}

/// Parse export text.
///
/// Unrecognized roots give [`Export::Empty`]; only text that claims a
/// known root but cannot be parsed is an error.
pub fn parse_export(text: &str) -> Result<Export> {
    let text = apply_renames(text);
    let Some(kind) = ExportKind::detect(&text) else {
        if !text.trim().is_empty() {
            tracing::warn!("export has no recognized root element");
        }
        return Ok(Export::Empty);
    };

    match kind {
        ExportKind::Selections | ExportKind::Recipe => {
            let (_, root) = parse_document(&sanitize(&text))?;
            match root {
                Value::Object(root) => Ok(Export::Recipes(Folder::from_node(root).into_recipes())),
                Value::Null => Ok(Export::Empty),
                other => Err(Error::MalformedExport(format!(
                    "root element holds text, not a folder: {}",
                    other
                ))),
            }
        }
        ExportKind::Archive => {
            let body = strip_declaration(&text);
            let wrapped = format!(
                "<{root}>{}</{root}>",
                sanitize(body),
                root = ARCHIVE_WRAPPER
            );
            let (_, root) = parse_document(&wrapped)?;
            let entries = Siblings::from_node(root.get("archive"))
                .iter()
                .filter_map(|node| match ArchiveEntry::from_node(node) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        tracing::warn!("skipping archive entry: {}", e);
                        None
                    }
                })
                .collect();
            Ok(Export::Archive(entries))
        }
    }
}

fn strip_declaration(text: &str) -> &str {
    let body = text.trim_start_matches('\u{feff}').trim_start();
    if body.starts_with("<?") {
        if let Some((_, rest)) = body.split_once("?>") {
            return rest;
        }
    }
    body
}

/// Where export files are read from.
pub trait ExportSource {
    /// Read the whole file called `name`.
    fn read_to_string(&self, name: &str) -> io::Result<String>;
}

impl<S: ExportSource + ?Sized> ExportSource for &S {
    fn read_to_string(&self, name: &str) -> io::Result<String> {
        (**self).read_to_string(name)
    }
}

/// Export files held in memory, by name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.insert(name, contents);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(name.into(), contents.into());
    }
}

impl ExportSource for MemorySource {
    fn read_to_string(&self, name: &str) -> io::Result<String> {
        self.files.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no export named '{}'", name))
        })
    }
}

/// Reads and parses export files from a source.
///
/// Every read is best effort: a file that is missing or cannot be parsed
/// is logged and reads as empty.
#[derive(Debug, Clone)]
pub struct ExportReader<X> {
    source: X,
}

impl<X: ExportSource> ExportReader<X> {
    pub fn new(source: X) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &X {
        &self.source
    }

    pub fn read(&self, file: &str) -> Export {
        let text = match self.source.read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(file, "cannot read export: {}", e);
                return Export::Empty;
            }
        };

        match parse_export(&text) {
            Ok(export) => export,
            Err(e) => {
                tracing::warn!(file, "cannot parse export: {}", e);
                Export::Empty
            }
        }
    }

    /// Every recipe in `file`, depth first.
    pub fn read_recipes(&self, file: &str) -> Vec<Recipe> {
        self.read(file).into_recipes()
    }

    /// The first recipe in `file`.
    pub fn read_recipe(&self, file: &str) -> Option<Recipe> {
        self.read_recipes(file).into_iter().next()
    }

    /// Archive entries in `file`, in file order.
    pub fn read_archive(&self, file: &str) -> Vec<ArchiveEntry> {
        self.read(file).into_archive()
    }
}
