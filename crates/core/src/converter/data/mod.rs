//! Structured data conversion, in-process.
//!
//! Routes, with JSON and YAML as the hubs:
//! - JSON to YAML, XML, CSV and Excel
//! - YAML to JSON and TOML
//! - TOML to YAML
//! - XML, CSV and Excel to JSON

mod table;
mod tree;
mod xml;

use async_trait::async_trait;
use serde_json::Value as Json;
use std::collections::BTreeSet;
use std::path::Path;

use super::command::ensure_input;
use super::error::ConverterError;
use super::extension::{extension_of, normalize_extension};
use super::options::ConversionOptions;
use super::traits::Converter;

use table::Table;

const SOURCES: &[&str] = &[
    ".json", ".yaml", ".yml", ".xml", ".toml", ".csv", ".xlsx", ".xls",
];

/// Converts between JSON, YAML, TOML, XML, CSV and Excel workbooks.
#[derive(Debug, Default, Clone)]
pub struct DataConverter;

impl DataConverter {
    pub fn new() -> Self {
        Self
    }

    fn targets_for(source_ext: &str) -> &'static [&'static str] {
        match source_ext {
            ".json" => &[".yaml", ".yml", ".xml", ".csv", ".xlsx", ".xls"],
            ".yaml" | ".yml" => &[".json", ".toml"],
            ".toml" => &[".yaml", ".yml"],
            ".xml" | ".csv" | ".xlsx" | ".xls" => &[".json"],
            _ => &[],
        }
    }

    /// Reads `input` into the common value model.
    fn read(source_ext: &str, input: Vec<u8>) -> Result<Json, ConverterError> {
        match source_ext {
            ".csv" => Ok(table::read_csv(&input)?.to_json()),
            ".xlsx" | ".xls" => Ok(table::read_workbook(input)?.to_json()),
            _ => {
                let text = String::from_utf8(input)
                    .map_err(|_| ConverterError::parse("input is not valid UTF-8"))?;
                match source_ext {
                    ".json" => tree::parse_json(&text),
                    ".yaml" | ".yml" => tree::parse_yaml(&text),
                    ".toml" => tree::parse_toml(&text),
                    ".xml" => xml::parse_xml(&text),
                    other => Err(ConverterError::unsupported(other, "data")),
                }
            }
        }
    }

    /// Renders `value` in the target format.
    fn write(target_ext: &str, value: Json) -> Result<Vec<u8>, ConverterError> {
        match target_ext {
            ".json" => tree::write_json(&value).map(String::into_bytes),
            ".yaml" | ".yml" => tree::write_yaml(&value).map(String::into_bytes),
            ".toml" => tree::write_toml(value).map(String::into_bytes),
            ".xml" => xml::write_xml(&value),
            ".csv" => table::write_csv(&Table::from_json(&value)),
            ".xlsx" | ".xls" => table::write_workbook(&Table::from_json(&value)),
            other => Err(ConverterError::unsupported("data", other)),
        }
    }

    /// Converts a document held in memory.
    pub(crate) fn transcode(
        source_ext: &str,
        target_ext: &str,
        input: Vec<u8>,
    ) -> Result<Vec<u8>, ConverterError> {
        let value = Self::read(source_ext, input)?;
        Self::write(target_ext, value)
    }
}

#[async_trait]
impl Converter for DataConverter {
    fn name(&self) -> &str {
        "Data Converter"
    }

    fn can_convert(&self, source_ext: &str, target_ext: &str) -> bool {
        let target_ext = normalize_extension(target_ext);
        Self::targets_for(&normalize_extension(source_ext)).contains(&target_ext.as_str())
    }

    fn supported_source_extensions(&self) -> BTreeSet<String> {
        SOURCES.iter().map(|s| s.to_string()).collect()
    }

    fn supported_target_formats(&self, source_ext: &str) -> BTreeSet<String> {
        Self::targets_for(&normalize_extension(source_ext))
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    async fn convert(
        &self,
        source: &Path,
        target: &Path,
        _options: &ConversionOptions,
    ) -> Result<(), ConverterError> {
        let (source_ext, target_ext) = (extension_of(source), extension_of(target));
        if !self.can_convert(&source_ext, &target_ext) {
            return Err(ConverterError::unsupported(source_ext, target_ext));
        }
        ensure_input(source).await?;

        let input = tokio::fs::read(source).await?;
        let output = Self::transcode(&source_ext, &target_ext, input)?;
        tokio::fs::write(target, output).await?;
        Ok(())
    }
}
