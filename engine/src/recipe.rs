//! Recipe normalization.
//!
//! Turns one raw recipe node into the flat document that is stored:
//! sections are pulled out and re-keyed, listings are resolved into
//! sequences, ingredients are classified, scalars are promoted to numbers
//! and structured notes are merged on top.

use crate::coerce::coerce_map;
use crate::ingredient::{Ingredient, Ingredients};
use crate::node::{text_of, Siblings};
use crate::notes::apply_notes;
use crate::prefix;
use crate::{error::Result, Error, RecipeId};
use serde_json::{Map, Value};

/// Fields the numeric promotion pass must not touch.
///
/// Identity stays text, and ingredients were already classified with their
/// codes read individually.
const UNCOERCED: &[&str] = &["_id", "name", "ingredients", "ingredients_by_type"];

/// A normalized recipe document.
///
/// Identity is the recipe name as exported. Renaming a recipe in the
/// source application therefore looks like a delete plus an insert.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    id: RecipeId,
    document: Map<String, Value>,
}

impl Recipe {
    /// Normalize a raw recipe node found in `folder`.
    pub fn from_raw(mut raw: Map<String, Value>, folder: &str) -> Result<Self> {
        let id = text_of(raw.get("name"))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::MissingRecipeName {
                folder: folder.to_string(),
            })?;

        raw.insert("_id".into(), Value::String(id.clone()));
        raw.insert("folder_name".into(), Value::String(format!("/{}/", folder)));

        let ingredients = match raw.remove("ingredients") {
            Some(Value::Object(mut table)) => Ingredients::from_table(table.remove("data").as_ref()),
            _ => Ingredients::default(),
        };
        raw.insert("ingredients_by_type".into(), ingredients.by_type_value());
        raw.insert("ingredients".into(), ingredients.ordered_value());

        let mash = mash(raw.remove("f_r_mash"));
        raw.insert("mash".into(), Value::Object(mash));

        for (source, target, section_prefix) in [
            ("f_r_equipment", "equipment", prefix::EQUIPMENT),
            ("f_r_style", "style", prefix::STYLE),
            ("f_r_carb", "carb", prefix::CARB),
            ("f_r_base_grain", "base_grain", prefix::BASE_GRAIN),
        ] {
            let section = section(section_prefix, raw.remove(source));
            raw.insert(target.into(), Value::Object(section));
        }

        let ferment = ferment(raw.remove("f_r_age"), raw.remove("agedata"));
        raw.insert("ferment".into(), Value::Object(ferment));

        let mut document = Map::new();
        document.insert("_type".into(), Value::String("recipe".into()));
        document.extend(prefix::strip_map(prefix::RECIPE, raw));

        let mut document = coerce_map(document, UNCOERCED);
        apply_notes(&mut document);
        document.insert("_id".into(), Value::String(id.clone()));

        Ok(Self { id, document })
    }

    /// Rebuild a recipe from a stored document.
    pub fn from_document(document: Value) -> Option<Self> {
        let Value::Object(document) = document else {
            return None;
        };
        let id = document.get("_id")?.as_str()?.to_string();
        Some(Self { id, document })
    }

    /// Store identity.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current name; structured notes may have replaced it.
    pub fn name(&self) -> Option<&str> {
        self.document.get("name").and_then(Value::as_str)
    }

    pub fn folder_name(&self) -> Option<&str> {
        self.document.get("folder_name").and_then(Value::as_str)
    }

    /// Ingredients in combined order.
    pub fn ingredients(&self) -> Vec<Ingredient> {
        self.document
            .get("ingredients")
            .cloned()
            .and_then(|list| serde_json::from_value(list).ok())
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    pub fn into_document(self) -> Value {
        Value::Object(self.document)
    }
}

/// Re-key a section; an absent or empty section is an empty mapping.
fn section(section_prefix: &str, node: Option<Value>) -> Map<String, Value> {
    match node {
        None | Some(Value::Null) => Map::new(),
        Some(node) => prefix::strip(section_prefix, &node),
    }
}

fn mash(node: Option<Value>) -> Map<String, Value> {
    let mut mash = section(prefix::MASH, node);
    let steps = match mash.remove("steps") {
        Some(Value::Object(mut steps)) => Siblings::take_data(&mut steps, "mashstep"),
        _ => Siblings::default(),
    };
    mash.insert(
        "steps".into(),
        Value::Array(prefix::strip_each(prefix::MASH_STEP, steps)),
    );
    mash
}

fn ferment(age: Option<Value>, agedata: Option<Value>) -> Map<String, Value> {
    let mut ferment = section(prefix::AGE, age);
    let mut agedata = match agedata {
        Some(Value::Object(agedata)) => agedata,
        _ => Map::new(),
    };
    let readings = Siblings::take_data(&mut agedata, "agedata");
    ferment.insert(
        "readings".into(),
        Value::Array(prefix::strip_each(prefix::AGE_DATA, readings)),
    );
    ferment.insert("agedata".into(), Value::Object(agedata));
    ferment
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    fn raw_recipe() -> Map<String, Value> {
        json!({
            "last_modified": "2021-11-16",
            "name": "2021-11-16_Reston Red Ale",
            "f_r_brewer": "Romano",
            "f_r_boil_time": "60.0000000",
            "f_r_notes": null,
            "f_r_style": {"f_s_name": "Irish Red Ale", "f_s_letter": "D", "f_s_number": "15"},
            "f_r_mash": {
                "f_mh_name": "Single Infusion",
                "f_mh_grain_temp": "72.0",
                "steps": {"name": "Steps", "data": {"mashstep": {"f_ms_name": "Mash In", "f_ms_step_temp": "152.0"}}}
            },
            "f_r_equipment": {"f_e_name": "Pot and Cooler"},
            "f_r_carb": {"f_c_name": "Keg"},
            "f_r_base_grain": {"f_g_name": "Pale Malt (2 Row)"},
            "f_r_age": {"f_a_name": "Ale, Two Stage", "f_a_prim_days": "4.0"},
            "agedata": {
                "name": "AgeData",
                "data": {"agedata": [{"f_ad_gravity": "1.050"}, {"f_ad_gravity": "1.012"}]}
            },
            "ingredients": {
                "name": "Ingredients",
                "data": {
                    "grain": [
                        {"f_g_name": "Pale Malt", "f_g_amount": "160.0", "f_g_type": "0", "f_order": "2"},
                        {"f_g_name": "Crystal 60", "f_g_amount": "8.0", "f_g_type": "0", "f_order": "1"}
                    ],
                    "hops": {"f_h_name": "Fuggle", "f_h_form": "0", "f_order": "3"}
                }
            }
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn identity_and_folder() {
        let recipe = Recipe::from_raw(raw_recipe(), "Recipes").unwrap();

        assert_eq!(recipe.id(), "2021-11-16_Reston Red Ale");
        assert_eq!(recipe.get("_id"), Some(&json!("2021-11-16_Reston Red Ale")));
        assert_eq!(recipe.get("_type"), Some(&json!("recipe")));
        assert_eq!(recipe.folder_name(), Some("/Recipes/"));
    }

    #[test]
    fn top_level_prefix_stripped_and_coerced() {
        let recipe = Recipe::from_raw(raw_recipe(), "Recipes").unwrap();

        assert_eq!(recipe.get("brewer"), Some(&json!("Romano")));
        assert_eq!(recipe.get("boil_time"), Some(&json!(60)));
        assert!(recipe.get("f_r_brewer").is_none());
        assert_eq!(recipe.get("style"), Some(&json!({"name": "Irish Red Ale", "letter": "D", "number": 15})));
    }

    #[test]
    fn sections_are_flattened() {
        let recipe = Recipe::from_raw(raw_recipe(), "Recipes").unwrap();

        assert_eq!(
            recipe.get("mash"),
            Some(&json!({
                "name": "Single Infusion",
                "grain_temp": 72,
                "steps": [{"name": "Mash In", "step_temp": 152}]
            }))
        );
        assert_eq!(recipe.get("equipment"), Some(&json!({"name": "Pot and Cooler"})));
        assert_eq!(recipe.get("carb"), Some(&json!({"name": "Keg"})));
        assert_eq!(recipe.get("base_grain"), Some(&json!({"name": "Pale Malt (2 Row)"})));

        let ferment = recipe.get("ferment").unwrap();
        assert_eq!(ferment["name"], "Ale, Two Stage");
        assert_eq!(ferment["prim_days"], 4);
        assert_eq!(ferment["readings"], json!([{"gravity": 1.05}, {"gravity": 1.012}]));
        assert_eq!(ferment["agedata"], json!({"name": "AgeData"}));
        assert!(recipe.get("agedata").is_none());
    }

    #[test]
    fn ingredients_are_classified_but_not_bulk_coerced() {
        let recipe = Recipe::from_raw(raw_recipe(), "Recipes").unwrap();

        let names: Vec<_> = recipe
            .ingredients()
            .iter()
            .filter_map(|i| i.name().map(str::to_string))
            .collect();
        assert_eq!(names, vec!["Crystal 60", "Pale Malt", "Fuggle"]);

        let by_type = recipe.get("ingredients_by_type").unwrap();
        assert_eq!(by_type["grain"].as_array().unwrap().len(), 2);
        assert_eq!(by_type["hops"][0]["subtype"], "pellet hops");
        // amounts stay as exported
        assert_eq!(by_type["grain"][0]["amount"], "160.0");
    }

    #[test]
    fn structured_notes_override_fields() {
        let mut raw = raw_recipe();
        raw.insert("f_r_notes".into(), json!("{\n  brewer: New Brewer\n  _id: hijacked\n}"));

        let recipe = Recipe::from_raw(raw, "Recipes").unwrap();

        assert_eq!(recipe.get("brewer"), Some(&json!("New Brewer")));
        assert_eq!(recipe.id(), "2021-11-16_Reston Red Ale");
        assert_eq!(recipe.get("_id"), Some(&json!("2021-11-16_Reston Red Ale")));
    }

    #[test]
    fn prose_notes_are_kept() {
        let mut raw = raw_recipe();
        raw.insert("f_r_notes".into(), json!("Great beer, brew again"));

        let recipe = Recipe::from_raw(raw, "Recipes").unwrap();
        assert_eq!(recipe.get("notes"), Some(&json!("Great beer, brew again")));
    }

    #[test]
    fn numeric_looking_names_stay_text() {
        let mut raw = raw_recipe();
        raw.insert("name".into(), json!("1776"));

        let recipe = Recipe::from_raw(raw, "Recipes").unwrap();
        assert_eq!(recipe.id(), "1776");
        assert_eq!(recipe.name(), Some("1776"));
    }

    #[test]
    fn missing_sections_degrade_to_empty_records() {
        let raw = json!({"name": "Bare"}).as_object().cloned().unwrap();
        let recipe = Recipe::from_raw(raw, "Recipes").unwrap();

        assert_eq!(recipe.get("mash"), Some(&json!({"steps": []})));
        assert_eq!(recipe.get("style"), Some(&json!({})));
        assert_eq!(recipe.get("ingredients"), Some(&json!([])));
        assert_eq!(recipe.get("ferment"), Some(&json!({"readings": [], "agedata": {}})));
    }

    #[test]
    fn nameless_recipe_is_rejected() {
        let raw = json!({"f_r_brewer": "Romano"}).as_object().cloned().unwrap();
        assert_eq!(
            Recipe::from_raw(raw, "Recipes"),
            Err(Error::MissingRecipeName {
                folder: "Recipes".into()
            })
        );
    }

    #[test]
    fn document_roundtrip() {
        let recipe = Recipe::from_raw(raw_recipe(), "Recipes").unwrap();
        let restored = Recipe::from_document(recipe.clone().into_document()).unwrap();

        assert_eq!(restored, recipe);
        assert!(Recipe::from_document(json!("not a document")).is_none());
    }

    #[test]
    #[traced_test]
    fn missing_sections_are_empty_without_warnings() {
        let raw = json!({"name": "Bare", "f_r_style": null})
            .as_object()
            .cloned()
            .unwrap();

        let recipe = Recipe::from_raw(raw, "Recipes").unwrap();

        assert_eq!(recipe.get("style"), Some(&json!({})));
        assert_eq!(recipe.get("equipment"), Some(&json!({})));
        assert_eq!(recipe.get("mash"), Some(&json!({"steps": []})));
        assert!(!logs_contain("cannot strip key prefixes"));
    }

    #[test]
    #[traced_test]
    fn text_section_is_reported() {
        let raw = json!({"name": "Odd", "f_r_carb": "Keg"})
            .as_object()
            .cloned()
            .unwrap();

        let recipe = Recipe::from_raw(raw, "Recipes").unwrap();

        assert_eq!(recipe.get("carb"), Some(&json!({})));
        assert!(logs_contain("cannot strip key prefixes from string node"));
    }
}
