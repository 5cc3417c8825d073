//! Ingredient classification and ordering.
//!
//! A recipe's ingredient table groups ingredients by type tag (`grain`,
//! `hops`, ...). Each type has a fixed field prefix, a fixed stored unit
//! and, for most types, a small enumeration code that names its subtype.
//! The recipe keeps both the grouped tables and one combined list in the
//! brewer's chosen order.

use crate::coerce::{as_code, coerce_scalar};
use crate::node::Siblings;
use crate::notes::apply_notes;
use crate::prefix::strip_map;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const GRAIN_TYPES: &[&str] = &["grain", "extract", "sugar", "adjunct", "dry extract"];
const HOP_FORMS: &[&str] = &[
    "pellet",
    "plug",
    "leaf",
    "extract (CO2)",
    "extract (isomerized)",
];
const YEAST_FORMS: &[&str] = &["liquid", "dry", "slant", "culture"];
const MISC_TYPES: &[&str] = &["spice", "fining", "herb", "flavor", "other", "water-agent"];

/// Ounces per pound.
const OUNCES_PER_POUND: f64 = 16.0;

/// Ingredient type, from the tag its table was stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IngredientType {
    Grain,
    Hops,
    Yeast,
    Misc,
    Water,
    /// A tag this engine has no tables for.
    Other(String),
}

/// How a type's enumeration code is turned into labels.
enum CodeLabel {
    /// The label is the subtype.
    Subtype,
    /// The label is the form; the subtype is `"{form} {suffix}"`.
    Form(&'static str),
}

impl IngredientType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "grain" => IngredientType::Grain,
            "hops" => IngredientType::Hops,
            "yeast" => IngredientType::Yeast,
            "misc" => IngredientType::Misc,
            "water" => IngredientType::Water,
            other => IngredientType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            IngredientType::Grain => "grain",
            IngredientType::Hops => "hops",
            IngredientType::Yeast => "yeast",
            IngredientType::Misc => "misc",
            IngredientType::Water => "water",
            IngredientType::Other(tag) => tag,
        }
    }

    /// Field prefix used by this type's records.
    pub fn prefix(&self) -> &'static str {
        match self {
            IngredientType::Grain => "f_g_",
            IngredientType::Hops => "f_h_",
            IngredientType::Yeast => "f_y_",
            IngredientType::Misc => "f_m_",
            IngredientType::Water => "f_w_",
            IngredientType::Other(_) => "",
        }
    }

    /// Unit amounts of this type are stored in.
    pub fn units(&self) -> &'static str {
        match self {
            IngredientType::Grain | IngredientType::Hops | IngredientType::Water => "oz",
            IngredientType::Yeast => "g",
            IngredientType::Misc | IngredientType::Other(_) => "",
        }
    }

    /// The enumeration code field and its lookup table, if the type has one.
    pub fn code_table(&self) -> Option<(&'static str, &'static [&'static str])> {
        match self {
            IngredientType::Grain => Some(("type", GRAIN_TYPES)),
            IngredientType::Hops => Some(("form", HOP_FORMS)),
            IngredientType::Yeast => Some(("form", YEAST_FORMS)),
            IngredientType::Misc => Some(("type", MISC_TYPES)),
            IngredientType::Water | IngredientType::Other(_) => None,
        }
    }

    fn code_label(&self) -> CodeLabel {
        match self {
            IngredientType::Hops => CodeLabel::Form("hops"),
            IngredientType::Yeast => CodeLabel::Form("yeast"),
            _ => CodeLabel::Subtype,
        }
    }
}

impl std::fmt::Display for IngredientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized ingredient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ingredient {
    fields: Map<String, Value>,
}

impl Ingredient {
    /// Normalize one raw ingredient record of the given type.
    pub fn from_raw(kind: &IngredientType, mut raw: Map<String, Value>) -> Self {
        let mut fields = Map::new();
        fields.insert("units".into(), Value::String(kind.units().into()));

        if let Some(order) = raw.remove("f_order") {
            fields.insert("order".into(), coerce_scalar(&order));
        }
        fields.extend(strip_map(kind.prefix(), raw));

        classify(kind, &mut fields);
        apply_notes(&mut fields);

        fields.insert(
            "ingredient_type".into(),
            Value::String(kind.as_str().to_string()),
        );

        Self { fields }
    }

    pub fn ingredient_type(&self) -> IngredientType {
        IngredientType::from_tag(self.get_str("ingredient_type").unwrap_or_default())
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn units(&self) -> &str {
        self.get_str("units").unwrap_or_default()
    }

    pub fn subtype(&self) -> Option<&str> {
        self.get_str("subtype")
    }

    /// Position in the recipe's combined ingredient list.
    pub fn order(&self) -> Option<f64> {
        self.get_f64("order")
    }

    pub fn amount(&self) -> Option<f64> {
        self.get_f64("amount")
    }

    /// Amount converted for display, see [`display_amount`].
    pub fn display_amount(&self) -> Option<(f64, String)> {
        let amount = self.amount()?;
        Some(display_amount(&self.ingredient_type(), amount, self.units()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn sort_key(&self) -> f64 {
        self.order().unwrap_or(f64::INFINITY)
    }
}

/// Resolve the type's enumeration code into `subtype` / `form_text`.
fn classify(kind: &IngredientType, fields: &mut Map<String, Value>) {
    let Some((code_field, table)) = kind.code_table() else {
        fields.insert("subtype".into(), Value::Null);
        return;
    };

    let label = fields
        .get(code_field)
        .and_then(as_code)
        .and_then(|code| usize::try_from(code).ok())
        .and_then(|code| table.get(code).copied());

    let Some(label) = label else {
        tracing::warn!(
            ingredient_type = %kind,
            code = ?fields.get(code_field),
            "unrecognized {} code",
            code_field
        );
        fields.insert("subtype".into(), Value::Null);
        return;
    };

    match kind.code_label() {
        CodeLabel::Subtype => {
            fields.insert("subtype".into(), Value::String(label.into()));
        }
        CodeLabel::Form(suffix) => {
            fields.insert("form_text".into(), Value::String(label.into()));
            fields.insert(
                "subtype".into(),
                Value::String(format!("{} {}", label, suffix)),
            );
        }
    }
}

/// A recipe's ingredients, grouped by type and in combined order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ingredients {
    /// Per-type lists, in table order.
    pub by_type: Vec<(IngredientType, Vec<Ingredient>)>,
    /// Every ingredient, stably sorted by `order`.
    pub ordered: Vec<Ingredient>,
}

impl Ingredients {
    /// Classify every sub-table of a raw ingredient table.
    pub fn from_table(table: Option<&Value>) -> Self {
        let Some(Value::Object(table)) = table else {
            return Self::default();
        };

        let mut by_type = Vec::with_capacity(table.len());
        let mut ordered = Vec::new();

        for (tag, sub_table) in table {
            let kind = IngredientType::from_tag(tag);
            if let IngredientType::Other(tag) = &kind {
                tracing::warn!("unhandled ingredient type: {}", tag);
            }

            let items: Vec<Ingredient> = Siblings::from_node(Some(sub_table))
                .into_iter()
                .map(|raw| Ingredient::from_raw(&kind, raw))
                .collect();

            ordered.extend(items.iter().cloned());
            by_type.push((kind, items));
        }

        ordered.sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));

        Self { by_type, ordered }
    }

    /// The grouped tables as a document mapping.
    pub fn by_type_value(&self) -> Value {
        Value::Object(
            self.by_type
                .iter()
                .map(|(kind, items)| {
                    (
                        kind.as_str().to_string(),
                        Value::Array(items.iter().cloned().map(Ingredient::into_value).collect()),
                    )
                })
                .collect(),
        )
    }

    /// The combined list as a document sequence.
    pub fn ordered_value(&self) -> Value {
        Value::Array(
            self.ordered
                .iter()
                .cloned()
                .map(Ingredient::into_value)
                .collect(),
        )
    }
}

/// Convert a stored amount into the unit it is usually shown in.
///
/// Grain stored in ounces is shown in pounds; everything else passes
/// through.
pub fn display_amount(kind: &IngredientType, amount: f64, units: &str) -> (f64, String) {
    match (kind, units) {
        (IngredientType::Grain, "oz") => (amount / OUNCES_PER_POUND, "lbs".to_string()),
        _ => (amount, units.to_string()),
    }
}
