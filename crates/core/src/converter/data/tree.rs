//! Document tree conversions with JSON values as the common model.

use serde_json::{Map, Number, Value as Json};
use serde_yaml::Value as Yaml;
use toml::Value as Toml;

use crate::converter::error::ConverterError;

pub(super) fn parse_json(input: &str) -> Result<Json, ConverterError> {
    serde_json::from_str(input).map_err(|e| ConverterError::parse(format!("invalid JSON: {e}")))
}

pub(super) fn parse_yaml(input: &str) -> Result<Json, ConverterError> {
    let value: Yaml = serde_yaml::from_str(input)
        .map_err(|e| ConverterError::parse(format!("invalid YAML: {e}")))?;
    Ok(yaml_to_json(value))
}

pub(super) fn parse_toml(input: &str) -> Result<Json, ConverterError> {
    let table: toml::Table =
        toml::from_str(input).map_err(|e| ConverterError::parse(format!("invalid TOML: {e}")))?;
    Ok(toml_to_json(Toml::Table(table)))
}

/// Indented JSON with a trailing newline.
pub(super) fn write_json(value: &Json) -> Result<String, ConverterError> {
    let mut out = serde_json::to_string_pretty(value)
        .map_err(|e| ConverterError::conversion_failed(format!("failed to write JSON: {e}"), None))?;
    out.push('\n');
    Ok(out)
}

pub(super) fn write_yaml(value: &Json) -> Result<String, ConverterError> {
    serde_yaml::to_string(value)
        .map_err(|e| ConverterError::conversion_failed(format!("failed to write YAML: {e}"), None))
}

/// Renders a document as TOML.
///
/// TOML has no null, so null members and array items are dropped. The top
/// level has to be a mapping.
pub(super) fn write_toml(value: Json) -> Result<String, ConverterError> {
    let Json::Object(map) = value else {
        return Err(ConverterError::parse(
            "TOML output requires a mapping at the top level",
        ));
    };

    let table = json_object_to_toml(map)?;
    toml::to_string_pretty(&table)
        .map_err(|e| ConverterError::conversion_failed(format!("failed to write TOML: {e}"), None))
}

fn json_object_to_toml(map: Map<String, Json>) -> Result<toml::Table, ConverterError> {
    let mut table = toml::Table::new();
    for (key, value) in map {
        if let Some(v) = json_to_toml(value)? {
            table.insert(key, v);
        }
    }
    Ok(table)
}

fn json_to_toml(value: Json) -> Result<Option<Toml>, ConverterError> {
    Ok(Some(match value {
        Json::Null => return Ok(None),
        Json::Bool(b) => Toml::Boolean(b),
        Json::String(s) => Toml::String(s),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Toml::Integer(i)
            } else if n.is_u64() {
                // TOML integers are signed 64-bit
                return Err(ConverterError::parse(format!(
                    "integer {n} is out of range for TOML"
                )));
            } else {
                match n.as_f64() {
                    Some(f) => Toml::Float(f),
                    None => {
                        return Err(ConverterError::parse(format!(
                            "number {n} cannot be represented in TOML"
                        )))
                    }
                }
            }
        }
        Json::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some(v) = json_to_toml(item)? {
                    out.push(v);
                }
            }
            Toml::Array(out)
        }
        Json::Object(map) => Toml::Table(json_object_to_toml(map)?),
    }))
}

fn toml_to_json(value: Toml) -> Json {
    match value {
        Toml::String(s) => Json::String(s),
        Toml::Integer(i) => Json::Number(i.into()),
        Toml::Float(f) => float_to_json(f),
        Toml::Boolean(b) => Json::Bool(b),
        Toml::Datetime(dt) => Json::String(dt.to_string()),
        Toml::Array(items) => Json::Array(items.into_iter().map(toml_to_json).collect()),
        Toml::Table(table) => Json::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect::<Map<_, _>>(),
        ),
    }
}

fn yaml_to_json(value: Yaml) -> Json {
    match value {
        Yaml::Null => Json::Null,
        Yaml::Bool(b) => Json::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Json::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Json::Number(u.into())
            } else {
                n.as_f64().map(float_to_json).unwrap_or(Json::Null)
            }
        }
        Yaml::String(s) => Json::String(s),
        Yaml::Sequence(items) => Json::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(mapping) => Json::Object(
            mapping
                .into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect::<Map<_, _>>(),
        ),
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Mapping keys become strings; YAML allows any scalar (or worse) as a key.
fn yaml_key(key: Yaml) -> String {
    match key {
        Yaml::String(s) => s,
        Yaml::Null => "null".to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Non-finite floats have no JSON form and are kept as their text.
fn float_to_json(f: f64) -> Json {
    Number::from_f64(f)
        .map(Json::Number)
        .unwrap_or_else(|| Json::String(f.to_string()))
}
