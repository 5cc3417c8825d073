//! XML text to raw node conversion.
//!
//! Export files are turned into an untyped [`Value`] tree using the same
//! conventions the exporting side has always been read with:
//!
//! - tag names are case-folded to lowercase
//! - text is whitespace-trimmed; an element with no text, children or
//!   attributes becomes `null`
//! - a tag repeated under one parent collapses into an array at the
//!   position of its first occurrence
//! - attributes become `@name` keys, text next to children becomes `#text`
//!
//! The result is deliberately ambiguous about single-vs-many children;
//! [`crate::node::Siblings`] resolves that before anything iterates.

use crate::{error::Result, Error};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

const TEXT_KEY: &str = "#text";

/// An element whose end tag has not been seen yet.
struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Self {
        let mut fields = Map::new();
        for attr in start.attributes().with_checks(false) {
            match attr {
                Ok(attr) => {
                    let key = format!("@{}", tag_name(attr.key.as_ref()));
                    let value = match attr.unescape_value() {
                        Ok(value) => value.into_owned(),
                        Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
                    };
                    fields.insert(key, Value::String(value));
                }
                Err(e) => tracing::debug!("skipping unreadable attribute: {}", e),
            }
        }

        Self {
            name: tag_name(start.name().as_ref()),
            fields,
            text: String::new(),
        }
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.fields.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        } else {
            let mut fields = self.fields;
            if !text.is_empty() {
                fields.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
            }
            Value::Object(fields)
        };
        (self.name, value)
    }
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

/// Insert a child, turning a repeated tag into an ordered array.
fn attach(fields: &mut Map<String, Value>, name: String, value: Value) {
    match fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(name, value);
        }
    }
}

fn finish(frame: Frame, stack: &mut [Frame], root: &mut Option<(String, Value)>) {
    let (name, value) = frame.close();
    match stack.last_mut() {
        Some(parent) => attach(&mut parent.fields, name, value),
        None => {
            if root.is_none() {
                *root = Some((name, value));
            }
        }
    }
}

/// Parse an XML document into its root tag name and content.
///
/// Mismatched end tags are accepted and elements still open at the end of
/// input are closed implicitly. Only the first top-level element is kept.
pub fn parse_document(text: &str) -> Result<(String, Value)> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().check_end_names = false;

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(Error::MalformedExport(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        };

        match event {
            Event::Start(start) => stack.push(Frame::open(&start)),
            Event::Empty(start) => finish(Frame::open(&start), &mut stack, &mut root),
            Event::End(_) => {
                if let Some(frame) = stack.pop() {
                    finish(frame, &mut stack, &mut root);
                }
            }
            Event::Text(content) => {
                if let Some(frame) = stack.last_mut() {
                    match content.unescape() {
                        Ok(decoded) => frame.text.push_str(&decoded),
                        Err(_) => frame.text.push_str(&String::from_utf8_lossy(&content)),
                    }
                }
            }
            Event::CData(content) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&content));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    while let Some(frame) = stack.pop() {
        finish(frame, &mut stack, &mut root);
    }

    root.ok_or_else(|| Error::MalformedExport("document has no root element".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_only_elements_become_strings() {
        let (root, value) = parse_document("<Recipe><Name> Red Ale </Name><Empty></Empty><Gone/></Recipe>").unwrap();

        assert_eq!(root, "recipe");
        assert_eq!(value, json!({"name": "Red Ale", "empty": null, "gone": null}));
    }

    #[test]
    fn repeated_tags_collapse_into_array() {
        let xml = "<Data><Grain><N>a</N></Grain><Hops><N>b</N></Hops><Grain><N>c</N></Grain></Data>";
        let (_, value) = parse_document(xml).unwrap();

        assert_eq!(
            value,
            json!({"grain": [{"n": "a"}, {"n": "c"}], "hops": {"n": "b"}})
        );
        // first occurrence keeps its position
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["grain", "hops"]);
    }

    #[test]
    fn attributes_and_mixed_text() {
        let (_, value) = parse_document(r#"<Step kind="mash">Hold<T>152</T></Step>"#).unwrap();

        assert_eq!(value, json!({"@kind": "mash", "t": "152", "#text": "Hold"}));
    }

    #[test]
    fn entities_and_cdata_are_decoded() {
        let (_, value) = parse_document("<N><A>Salt &amp; Pepper</A><B><![CDATA[1 < 2]]></B></N>").unwrap();

        assert_eq!(value["a"], "Salt & Pepper");
        assert_eq!(value["b"], "1 < 2");
    }

    #[test]
    fn unclosed_elements_are_closed_at_eof() {
        let (root, value) = parse_document("<Selections><Name>Top</Name><Data><Recipe><Name>x</Name>").unwrap();

        assert_eq!(root, "selections");
        assert_eq!(value["data"]["recipe"]["name"], "x");
    }

    #[test]
    fn mismatched_end_tag_is_tolerated() {
        let (_, value) = parse_document("<A><B>1</b><C>2</C></A>").unwrap();
        assert_eq!(value, json!({"b": "1", "c": "2"}));
    }

    #[test]
    fn empty_input_has_no_root() {
        assert!(matches!(
            parse_document("   "),
            Err(Error::MalformedExport(_))
        ));
    }
}
