use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::entity::{Color, ColorLink, Pattern, PatternLink, Tissue};

/// Constant tag identifying the full-export format family.
pub const SCHEMA: &str = "razai-tools.full-export";

/// Current format generation.
///
/// - v1: tissues, colors, links
/// - v2: + settings
/// - v3: + patterns, patternLinks
/// - v4: + attachments, integrity
pub const CURRENT_VERSION: u32 = 4;

/// Algorithm label stamped next to the integrity digest.
pub const HASH_ALGORITHM: &str = "SHA-256";

/// A complete, versioned snapshot of the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullExportPayload {
    pub schema: String,
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub counts: ExportCounts,
    pub tissues: Vec<Tissue>,
    pub colors: Vec<Color>,
    pub patterns: Vec<Pattern>,
    pub links: Vec<ColorLink>,
    pub pattern_links: Vec<PatternLink>,
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    pub integrity: Integrity,
}

impl FullExportPayload {
    /// Serialize to compact JSON text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to indented JSON text (for files meant to be read by people).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Derived per-kind counts. Informational only; never trusted on import.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCounts {
    pub tissues: usize,
    pub colors: usize,
    pub patterns: usize,
    pub links: usize,
    pub pattern_links: usize,
    /// Deduplicated attachment count, not the per-record image count.
    pub attachments: usize,
}

/// A content-addressed binary blob embedded in the export.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
}

/// Best-effort application settings carried along with the catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue_boundaries: Option<HueBoundaries>,
}

impl Settings {
    pub fn is_empty(&self) -> bool {
        self.delta_threshold.is_none() && self.hue_boundaries.is_none()
    }
}

/// Start angles (degrees on the a*b* plane) of each hue family sector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HueBoundaries {
    #[serde(rename = "vermelhoStart")]
    pub red_start: f64,
    #[serde(rename = "laranjaStart")]
    pub orange_start: f64,
    #[serde(rename = "amareloStart")]
    pub yellow_start: f64,
    #[serde(rename = "verdeStart")]
    pub green_start: f64,
    #[serde(rename = "verdeEnd")]
    pub green_end: f64,
    #[serde(rename = "azulStart")]
    pub blue_start: f64,
    #[serde(rename = "roxoStart")]
    pub purple_start: f64,
    #[serde(rename = "magentaStart")]
    pub pink_start: f64,
}

impl Default for HueBoundaries {
    fn default() -> Self {
        Self {
            red_start: 345.0,
            orange_start: 20.0,
            yellow_start: 65.0,
            green_start: 95.0,
            green_end: 170.0,
            blue_start: 170.0,
            purple_start: 270.0,
            pink_start: 310.0,
        }
    }
}

/// The tamper-detecting stamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integrity {
    #[serde(default = "default_algorithm")]
    pub hash_algorithm: String,
    pub hash_hex: Digest,
}

impl Integrity {
    pub fn sha256(hash_hex: Digest) -> Self {
        Self {
            hash_algorithm: HASH_ALGORITHM.to_string(),
            hash_hex,
        }
    }
}

fn default_algorithm() -> String {
    HASH_ALGORITHM.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_payload() -> FullExportPayload {
        FullExportPayload {
            schema: SCHEMA.into(),
            version: CURRENT_VERSION,
            generated_at: Utc::now(),
            counts: ExportCounts::default(),
            tissues: vec![],
            colors: vec![],
            patterns: vec![],
            links: vec![],
            pattern_links: vec![],
            attachments: vec![],
            settings: None,
            integrity: Integrity::sha256(Digest::from_hash([7; 32])),
        }
    }

    #[test]
    fn wire_field_names() {
        let value = serde_json::to_value(empty_payload()).unwrap();
        assert_eq!(value["schema"], SCHEMA);
        assert_eq!(value["version"], 4);
        assert!(value.get("generatedAt").is_some());
        assert!(value.get("patternLinks").is_some());
        assert_eq!(value["counts"]["patternLinks"], 0);
        assert_eq!(value["integrity"]["hashAlgorithm"], "SHA-256");
        assert_eq!(value["integrity"]["hashHex"], "07".repeat(32));
        assert!(value.get("settings").is_none());
    }

    #[test]
    fn payload_json_roundtrip() {
        let payload = empty_payload();
        let text = payload.to_json().unwrap();
        let back: FullExportPayload = serde_json::from_str(&text).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn hue_boundaries_use_wire_names() {
        let value = serde_json::to_value(HueBoundaries::default()).unwrap();
        assert_eq!(value["vermelhoStart"], 345.0);
        assert_eq!(value["magentaStart"], 310.0);
    }

    #[test]
    fn integrity_algorithm_defaults_when_absent() {
        let integrity: Integrity =
            serde_json::from_str(&format!("{{\"hashHex\":\"{}\"}}", "ab".repeat(32))).unwrap();
        assert_eq!(integrity.hash_algorithm, HASH_ALGORITHM);
    }
}
