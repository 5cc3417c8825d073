//! Folder trees in recipe exports.
//!
//! Exports nest folders inside folders. Each listing item is classified
//! once, when the tree is built, so traversal never has to look at marker
//! fields again.

use crate::node::{text_of, Siblings};
use crate::recipe::Recipe;
use serde_json::{Map, Value};

/// Marker value of `xname` on folder items.
const FOLDER_MARKER: &str = "Folder";

/// One item of a folder listing.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportNode {
    /// A raw recipe node.
    Leaf(Map<String, Value>),
    /// A nested folder.
    Folder(Folder),
}

impl ExportNode {
    fn classify(item: Map<String, Value>) -> Self {
        let is_folder = item.get("xname").and_then(Value::as_str) == Some(FOLDER_MARKER);
        if is_folder {
            ExportNode::Folder(Folder::from_node(item))
        } else {
            ExportNode::Leaf(item)
        }
    }
}

/// A folder and its items, in export order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Folder {
    pub name: String,
    pub children: Vec<ExportNode>,
}

impl Folder {
    /// Build the tree below a folder node.
    ///
    /// Items are listed in the node's `data` table under either a recipe
    /// tag or a nested-folder tag; every tag is read, in order. A folder
    /// without data has no children.
    pub fn from_node(mut node: Map<String, Value>) -> Self {
        let name = text_of(node.get("name")).unwrap_or_default();
        let children = match node.remove("data") {
            Some(Value::Object(listing)) => listing
                .into_iter()
                .flat_map(|(_, items)| Siblings::from_node(Some(&items)))
                .map(ExportNode::classify)
                .collect(),
            _ => Vec::new(),
        };

        Self { name, children }
    }

    /// Normalize every recipe in the tree, depth first.
    ///
    /// Recipes that cannot be normalized are logged and left out.
    pub fn into_recipes(self) -> Vec<Recipe> {
        let mut recipes = Vec::new();
        self.collect_into(&mut recipes);
        recipes
    }

    fn collect_into(self, recipes: &mut Vec<Recipe>) {
        for child in self.children {
            match child {
                ExportNode::Leaf(raw) => match Recipe::from_raw(raw, &self.name) {
                    Ok(recipe) => recipes.push(recipe),
                    Err(e) => tracing::warn!("skipping recipe: {}", e),
                },
                ExportNode::Folder(folder) => folder.collect_into(recipes),
            }
        }
    }
}
