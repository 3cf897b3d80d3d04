//! Normalized row types and sidecar file models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::source::Provenance;

/// One tidy World Bank observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WbRow {
    pub country: String,
    pub iso2c: String,
    pub year: i32,
    pub indicator: String,
    pub value: Option<f64>,
    pub unit: String,
}

/// One normalized FAOSTAT observation with provenance tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaoRow {
    pub area_code: Option<u32>,
    pub area: String,
    pub item_code: String,
    pub item: String,
    pub element: String,
    pub year: String,
    pub value: Option<f64>,
    pub unit: String,
    #[serde(rename = "_source")]
    pub source: Provenance,
    #[serde(rename = "_domain")]
    pub domain: String,
}

/// Indicator dictionary entry (`_dictionary.csv`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DictionaryRow {
    pub indicator_code: String,
    pub name: String,
    pub unit: String,
    pub group: String,
    pub wb_name: String,
    pub wb_source_note: String,
}

/// Machine-readable index of the files one source wrote in this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub source: String,
    pub generated_at: String,
    pub items: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            generated_at: now_iso(),
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub path: String,
    #[serde(flatten)]
    pub dimensions: BTreeMap<String, String>,
    pub rows: usize,
    pub updated_at: String,
}

impl ManifestEntry {
    pub fn new(path: impl Into<String>, rows: usize) -> Self {
        Self {
            path: path.into(),
            dimensions: BTreeMap::new(),
            rows,
            updated_at: now_iso(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(key.into(), value.into());
        self
    }
}

/// Top-level `_freshness.json`: per source, the generation timestamp of its
/// last successful manifest write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessStamp {
    pub generated_at: String,
    pub sources: BTreeMap<String, String>,
}

impl FreshnessStamp {
    pub fn new() -> Self {
        Self {
            generated_at: now_iso(),
            sources: BTreeMap::new(),
        }
    }
}

impl Default for FreshnessStamp {
    fn default() -> Self {
        Self::new()
    }
}

/// Current UTC time as an RFC3339 string for manifests and stamps.
pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fao_row_serializes_provenance_tags() {
        let row = FaoRow {
            area_code: Some(388),
            area: String::from("Jamaica"),
            item_code: String::from("2511"),
            item: String::from("Wheat and products"),
            element: String::from("Production"),
            year: String::from("2020"),
            value: Some(1.0),
            unit: String::from("1000 t"),
            source: Provenance::Bulk,
            domain: String::from("FBS"),
        };
        let json = serde_json::to_value(&row).expect("serializes");
        assert_eq!(json["_source"], "bulk");
        assert_eq!(json["_domain"], "FBS");
    }

    #[test]
    fn manifest_entry_flattens_dimensions() {
        let entry = ManifestEntry::new("data/world_bank/BZ/SP.POP.TOTL.csv", 12)
            .with("country", "BZ")
            .with("indicator", "SP.POP.TOTL");
        let json = serde_json::to_value(&entry).expect("serializes");
        assert_eq!(json["country"], "BZ");
        assert_eq!(json["rows"], 12);
    }

    #[test]
    fn now_iso_is_rfc3339_utc() {
        let stamp = now_iso();
        assert!(stamp.ends_with('Z') || stamp.contains("+00:00"), "{stamp}");
        assert!(OffsetDateTime::parse(&stamp, &Rfc3339).is_ok());
    }
}
