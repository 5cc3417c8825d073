//! Structural normalization of raw export nodes.
//!
//! A repeatable sub-table in an export arrives as `null` (no children), a
//! single mapping (one child) or an array of mappings (several children),
//! depending only on how many siblings the exporter wrote. [`Siblings`] is
//! the one place that ambiguity is resolved; every ingredient table, mash
//! step list, reading list and folder listing goes through it.

use serde_json::{Map, Value};

/// An ordered run of sibling mappings from a single tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Siblings(Vec<Map<String, Value>>);

impl Siblings {
    /// Resolve a node into its sibling mappings, preserving source order.
    ///
    /// `None` and `null` give no siblings, a mapping gives one, and an array
    /// gives one per mapping element. Scalars carry no mappings and are
    /// dropped.
    pub fn from_node(node: Option<&Value>) -> Self {
        match node {
            None | Some(Value::Null) => Self::default(),
            Some(Value::Object(map)) => Self(vec![map.clone()]),
            Some(Value::Array(items)) => Self(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::Object(map) => Some(map.clone()),
                        other => {
                            tracing::debug!("dropping non-mapping sibling: {}", other);
                            None
                        }
                    })
                    .collect(),
            ),
            Some(other) => {
                tracing::debug!("node has no sibling mappings: {}", other);
                Self::default()
            }
        }
    }

    /// Pull the `data` child out of a sub-table and resolve the siblings
    /// stored under `item_tag` inside it.
    ///
    /// This is the shape every export listing has:
    /// `<steps><data><mashstep/>...</data></steps>`.
    pub fn take_data(table: &mut Map<String, Value>, item_tag: &str) -> Self {
        match table.remove("data") {
            Some(Value::Object(data)) => Self::from_node(data.get(item_tag)),
            _ => Self::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.0.iter()
    }
}

impl IntoIterator for Siblings {
    type Item = Map<String, Value>;
    type IntoIter = std::vec::IntoIter<Map<String, Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Read a node as display text, accepting strings and numbers.
pub(crate) fn text_of(node: Option<&Value>) -> Option<String> {
    match node? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
