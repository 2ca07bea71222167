use std::collections::BTreeMap;

use exn::ResultExt;

use super::Normalizer;
use crate::error::{ErrorKind, Result};
use crate::models::{ModelEntry, ModelInfo, SupportedDevicesEntry};

/// Reads a hand-maintained model table (one per OS generation).
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelTableNormalizer;

impl Normalizer for ModelTableNormalizer {
    type Output = Vec<ModelEntry>;

    fn format(&self) -> &'static str {
        "model-table"
    }

    fn normalize(&self, raw: &str) -> Result<Vec<ModelEntry>> {
        serde_json::from_str(raw).or_raise(|| ErrorKind::MalformedDocument(self.format()))
    }
}

/// Reads the local table of devices supported by each OS version.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupportedDevicesNormalizer;

impl Normalizer for SupportedDevicesNormalizer {
    type Output = Vec<SupportedDevicesEntry>;

    fn format(&self) -> &'static str {
        "supported-devices"
    }

    fn normalize(&self, raw: &str) -> Result<Vec<SupportedDevicesEntry>> {
        serde_json::from_str(raw).or_raise(|| ErrorKind::MalformedDocument(self.format()))
    }
}

/// Merges per-generation model tables into one map of model identifier to
/// supported generations.
///
/// `tables` pairs a generation label such as "macOS Sonoma 14" with its
/// table. The first table mentioning an identifier provides its marketing
/// name.
pub fn merge_model_tables<'a>(tables: impl IntoIterator<Item = (&'a str, &'a [ModelEntry])>) -> BTreeMap<String, ModelInfo> {
    let mut merged: BTreeMap<String, ModelInfo> = BTreeMap::new();
    for (label, entries) in tables {
        // "macOS Sonoma 14" is listed as "Sonoma 14", major version 14.
        let generation = label.split_once(' ').map_or(label, |(_, rest)| rest).trim();
        let major = generation.split_whitespace().last().and_then(|word| word.parse::<u32>().ok());
        for entry in entries {
            for (identifier, marketing_name) in &entry.identifiers {
                let info = merged.entry(identifier.clone()).or_insert_with(|| ModelInfo {
                    marketing_name: marketing_name.clone(),
                    ..ModelInfo::default()
                });
                if !info.supported_os.iter().any(|os| os == generation) {
                    info.supported_os.push(generation.to_string());
                }
                if let Some(major) = major
                    && !info.os_versions.contains(&major)
                {
                    info.os_versions.push(major);
                }
            }
        }
    }
    merged
}
