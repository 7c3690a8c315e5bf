//! XML mapped onto JSON values.
//!
//! Elements become object members named after the tag. Repeated sibling tags
//! collect into an array, attributes are members prefixed with `-`, and text
//! next to attributes or child elements lives under `#text`. An element with
//! only text is a plain string. Values are not typed: `<n>4</n>` reads back
//! as the string `"4"`.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value as Json};
use std::fmt::Display;

use crate::converter::error::ConverterError;

const ATTRIBUTE_PREFIX: char = '-';
const TEXT_KEY: &str = "#text";
const ROOT: &str = "root";
const ITEM: &str = "item";

fn invalid(e: impl Display) -> ConverterError {
    ConverterError::parse(format!("invalid XML: {e}"))
}

fn write_failed(e: impl Display) -> ConverterError {
    ConverterError::conversion_failed(format!("failed to write XML: {e}"), None)
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

fn scalar_text(value: &Json) -> String {
    match value {
        Json::Null => String::new(),
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Serializes a JSON value as an indented XML document.
///
/// An object with a single non-array member becomes the document element.
/// Anything else is wrapped in `<root>`, with top-level array items as
/// `<item>` elements.
pub(super) fn write_xml(value: &Json) -> Result<Vec<u8>, ConverterError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_failed)?;

    match value {
        Json::Object(map) if map.len() == 1 && !map.values().any(Json::is_array) => {
            for (name, child) in map {
                write_element(&mut writer, name, child)?;
            }
        }
        Json::Array(items) => {
            writer
                .write_event(Event::Start(BytesStart::new(ROOT)))
                .map_err(write_failed)?;
            for item in items {
                write_element(&mut writer, ITEM, item)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(ROOT)))
                .map_err(write_failed)?;
        }
        other => write_element(&mut writer, ROOT, other)?,
    }

    Ok(writer.into_inner())
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &Json,
) -> Result<(), ConverterError> {
    if !is_valid_name(name) {
        return Err(ConverterError::parse(format!(
            "\"{name}\" cannot be used as an XML element name"
        )));
    }

    match value {
        Json::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
            Ok(())
        }
        Json::Object(map) => {
            let mut start = BytesStart::new(name);
            let mut text = None;
            let mut children = Vec::new();
            for (key, child) in map {
                if key == TEXT_KEY {
                    text = Some(scalar_text(child));
                } else if let Some(attr) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                    if !is_valid_name(attr) {
                        return Err(ConverterError::parse(format!(
                            "\"{attr}\" cannot be used as an XML attribute name"
                        )));
                    }
                    start.push_attribute((attr, scalar_text(child).as_str()));
                } else {
                    children.push((key.as_str(), child));
                }
            }

            if children.is_empty() && text.as_deref().map_or(true, str::is_empty) {
                return writer.write_event(Event::Empty(start)).map_err(write_failed);
            }
            writer.write_event(Event::Start(start)).map_err(write_failed)?;
            if let Some(text) = text.filter(|t| !t.is_empty()) {
                writer
                    .write_event(Event::Text(BytesText::new(&text)))
                    .map_err(write_failed)?;
            }
            for (key, child) in children {
                write_element(writer, key, child)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(write_failed)
        }
        Json::Null => writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(write_failed),
        scalar => {
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(write_failed)?;
            let text = scalar_text(scalar);
            if !text.is_empty() {
                writer
                    .write_event(Event::Text(BytesText::new(&text)))
                    .map_err(write_failed)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(write_failed)
        }
    }
}

/// An element being read.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<(String, Json)>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, ConverterError> {
        let mut element = Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            ..Self::default()
        };
        for attr in start.attributes() {
            let attr = attr.map_err(invalid)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(invalid)?.into_owned();
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    fn into_json(self) -> Json {
        if self.attributes.is_empty() && self.children.is_empty() {
            return Json::String(self.text);
        }

        let mut map = Map::new();
        for (key, value) in self.attributes {
            map.insert(format!("{ATTRIBUTE_PREFIX}{key}"), Json::String(value));
        }
        for (name, value) in self.children {
            // Child values are strings or objects, so an array here means
            // the tag already repeated
            match map.get_mut(&name) {
                Some(Json::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Json::Array(vec![first, value]);
                }
                None => {
                    map.insert(name, value);
                }
            }
        }
        if !self.text.is_empty() {
            map.insert(TEXT_KEY.to_string(), Json::String(self.text));
        }
        Json::Object(map)
    }
}

/// Hands a finished element to its parent, or makes it the document element.
fn attach(
    element: Element,
    open: &mut [Element],
    root: &mut Option<(String, Json)>,
) -> Result<(), ConverterError> {
    let name = element.name.clone();
    let value = element.into_json();
    match open.last_mut() {
        Some(parent) => parent.children.push((name, value)),
        None if root.is_some() => {
            return Err(ConverterError::parse(
                "invalid XML: more than one document element",
            ))
        }
        None => *root = Some((name, value)),
    }
    Ok(())
}

/// Parses an XML document into `{ "<document element>": ... }`.
pub(super) fn parse_xml(input: &str) -> Result<Json, ConverterError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<(String, Json)> = None;

    loop {
        match reader.read_event().map_err(invalid)? {
            Event::Start(start) => open.push(Element::open(&start)?),
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                attach(element, &mut open, &mut root)?;
            }
            Event::End(_) => {
                let element = open
                    .pop()
                    .ok_or_else(|| ConverterError::parse("invalid XML: unexpected closing tag"))?;
                attach(element, &mut open, &mut root)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(invalid)?;
                if let Some(element) = open.last_mut() {
                    element.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(element) = open.last_mut() {
                    element.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !open.is_empty() {
        return Err(ConverterError::parse("invalid XML: unexpected end of document"));
    }
    let (name, value) =
        root.ok_or_else(|| ConverterError::parse("invalid XML: no document element"))?;

    let mut document = Map::new();
    document.insert(name, value);
    Ok(Json::Object(document))
}
